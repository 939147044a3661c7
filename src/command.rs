use crate::builtin::BuiltinAction;
use std::fmt;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, like POSIX shells do.
pub type ExitCode = i32;

/// One command of a pipeline: the program name followed by its arguments.
///
/// Tokens are owned strings and are never empty. A segment with no tokens at all
/// comes out of the lexer for stages like the right side of `ls |`; such a
/// segment is never launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    tokens: Vec<String>,
}

impl Segment {
    /// Build a segment from tokens, skipping empty ones.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    /// Token[0], the command name.
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// The full argument vector, command name included.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// One or two segments joined by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Segment>,
}

impl Pipeline {
    /// A pipeline without a pipe delimiter.
    pub fn single(segment: Segment) -> Self {
        Self {
            stages: vec![segment],
        }
    }

    /// `first | second`.
    pub fn piped(first: Segment, second: Segment) -> Self {
        Self {
            stages: vec![first, second],
        }
    }

    pub fn stages(&self) -> &[Segment] {
        &self.stages
    }

    pub fn is_piped(&self) -> bool {
        self.stages.len() == 2
    }

    /// True when any stage has no tokens, which makes the whole line a no-op.
    pub fn has_empty_stage(&self) -> bool {
        self.stages.iter().any(Segment::is_empty)
    }

    pub fn into_stages(self) -> Vec<Segment> {
        self.stages
    }
}

/// What the dispatch loop decided to do with one input line.
///
/// Produced once per line by [`crate::Interpreter::classify`] and consumed right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// The first stage named a builtin; any second stage is ignored.
    Builtin(BuiltinAction),
    /// A single external program.
    SingleExternal(Segment),
    /// Two external programs, the first one's stdout feeding the second one's stdin.
    PipedExternal(Segment, Segment),
}
