/// Longest accepted input line, in characters (trailing newline excluded).
pub const MAX_LINE_LENGTH: usize = 1000;

/// Largest number of tokens kept per pipeline stage. Extra tokens are dropped.
pub const MAX_ARG_COUNT: usize = 100;

/// Number of stages a pipeline may have: a single command or `a | b`.
pub const MAX_STAGES: usize = 2;

/// Prompt shown by the interactive front end.
pub const DEFAULT_PROMPT: &str = "> ";

/// What to do with text after the second pipe delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipeOverflow {
    /// Silently drop the third and later stages.
    #[default]
    Discard,
    /// Refuse the whole line with a diagnostic.
    Reject,
}

/// Runtime knobs of the shell.
///
/// The binary fills this from its command line; [`Default`] uses the constants above.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Prompt passed to the line editor.
    pub prompt: String,
    /// Lines longer than this are rejected, never truncated.
    pub max_line_length: usize,
    /// Tokens per stage beyond this are dropped.
    pub max_args: usize,
    /// Policy for a third pipe delimiter.
    pub pipe_overflow: PipeOverflow,
    /// When set, the dispatch loop writes `[trace]` lines to stderr.
    pub trace: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line_length: MAX_LINE_LENGTH,
            max_args: MAX_ARG_COUNT,
            pipe_overflow: PipeOverflow::default(),
            trace: false,
        }
    }
}
