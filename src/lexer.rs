//! Lexical analysis of one input line into a one- or two-stage pipeline.
//!
//! The grammar is deliberately tiny: the line is cut on `|` into at most
//! [`MAX_STAGES`] pieces, and every piece is cut on runs of whitespace. There is
//! no quoting, no escaping and no expansion, so `echo "a b"` yields the tokens
//! `echo`, `"a` and `b"`.

use crate::command::{Pipeline, Segment};
use crate::config::{MAX_STAGES, PipeOverflow, ShellConfig};
use std::fmt;

/// The pipe delimiter.
pub const PIPE: char = '|';

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    /// The line is longer than the configured maximum.
    LineTooLong { len: usize, max: usize },
    /// More pipe delimiters than supported stages, under [`PipeOverflow::Reject`].
    TooManyStages { found: usize, max: usize },
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexingError::LineTooLong { len, max } => {
                write!(f, "input line too long ({} > {} characters)", len, max)
            }
            LexingError::TooManyStages { found, max } => write!(
                f,
                "too many pipeline stages ({}, at most {} supported)",
                found, max
            ),
        }
    }
}

impl std::error::Error for LexingError {}

/// Result of a successful lexing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    pub pipeline: Pipeline,
    /// Tokens cut off by the per-stage limit, summed over all stages.
    pub dropped_tokens: usize,
}

/// Turn a raw line into a [`Pipeline`].
///
/// Stages may come back empty (`"ls |"`, `"   "`); the caller decides what to do
/// with them. Text after a second `|` is discarded or rejected depending on
/// `config.pipe_overflow`.
pub fn tokenize(line: &str, config: &ShellConfig) -> Result<Lexed, LexingError> {
    let line = line.trim_end_matches(['\n', '\r']);

    let len = line.chars().count();
    if len > config.max_line_length {
        return Err(LexingError::LineTooLong {
            len,
            max: config.max_line_length,
        });
    }

    let mut pieces = line.split(PIPE);
    let first = pieces.next().unwrap_or_default();
    let second = pieces.next();
    let overflow = pieces.count();

    if overflow > 0 && config.pipe_overflow == PipeOverflow::Reject {
        return Err(LexingError::TooManyStages {
            found: MAX_STAGES + overflow,
            max: MAX_STAGES,
        });
    }

    let (first, mut dropped_tokens) = split_words(first, config.max_args);
    let pipeline = match second {
        Some(raw) => {
            let (second, dropped) = split_words(raw, config.max_args);
            dropped_tokens += dropped;
            Pipeline::piped(first, second)
        }
        None => Pipeline::single(first),
    };

    Ok(Lexed {
        pipeline,
        dropped_tokens,
    })
}

/// Split one stage on whitespace runs, keeping at most `max_args` tokens.
///
/// Returns the segment and how many tokens were dropped.
fn split_words(raw: &str, max_args: usize) -> (Segment, usize) {
    let mut words = raw.split_whitespace();
    let segment = Segment::new(words.by_ref().take(max_args));
    (segment, words.count())
}
