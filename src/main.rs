use argh::FromArgs;
use pipeshell::Interpreter;
use pipeshell::config::{DEFAULT_PROMPT, MAX_ARG_COUNT, MAX_LINE_LENGTH, PipeOverflow, ShellConfig};

#[derive(FromArgs)]
/// A line-oriented shell with builtins and two-stage pipelines.
struct Args {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt shown before each line
    prompt: String,

    #[argh(switch)]
    /// reject lines with more than one `|` instead of dropping the extra stages
    strict_pipes: bool,

    #[argh(option, default = "MAX_ARG_COUNT")]
    /// maximum number of arguments kept per stage; extra ones are dropped
    max_args: usize,

    #[argh(option, default = "MAX_LINE_LENGTH")]
    /// maximum accepted line length in characters; longer lines are rejected
    max_line_length: usize,

    #[argh(switch, short = 't')]
    /// print tokenizer and launcher traces to stderr
    trace: bool,

    #[argh(option, short = 'c')]
    /// run a single line and exit instead of reading from the terminal
    command: Option<String>,
}

impl Args {
    fn config(&self) -> ShellConfig {
        ShellConfig {
            prompt: self.prompt.clone(),
            max_line_length: self.max_line_length,
            max_args: self.max_args,
            pipe_overflow: if self.strict_pipes {
                PipeOverflow::Reject
            } else {
                PipeOverflow::Discard
            },
            trace: self.trace,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    let mut shell = Interpreter::new(args.config());

    match &args.command {
        Some(line) => {
            shell.execute_line(line, &mut std::io::stdout())?;
        }
        None => shell.repl()?,
    }

    // Only reached through `exit` or end of input; every child has been reaped.
    Ok(())
}
