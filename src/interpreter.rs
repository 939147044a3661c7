use crate::builtin::BuiltinTable;
use crate::command::{ExecutionDecision, Pipeline};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::external;
use crate::lexer;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fmt::Display;
use std::io::Write;
use std::process::Stdio;

/// Where the dispatch loop gets its lines from.
pub trait LineSource {
    /// Show `prompt` and return the next line, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive front end backed by [`rustyline`].
///
/// Non-blank lines go to the editor's in-memory history; nothing is persisted.
pub struct RustylineSource {
    editor: DefaultEditor,
}

impl RustylineSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialise the line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the partial line and prompts again.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// `exit` ran; stop reading.
    Exit,
}

/// A minimal interactive shell: read a line, split it into at most two stages,
/// run a builtin or launch external programs, repeat.
///
/// Builtins are looked up on the first stage only. When the first stage is a
/// builtin, a second stage is never run.
///
/// Example
/// ```
/// use pipeshell::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.env_mut().set_var("USER", "alice");
/// let mut out = Vec::new();
/// sh.execute_line("hello", &mut out).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "Hello alice!\n");
/// ```
pub struct Interpreter {
    env: Environment,
    config: ShellConfig,
    builtins: BuiltinTable,
}

impl Interpreter {
    /// Create an interpreter over a snapshot of the current process environment.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_env(config, Environment::new())
    }

    /// Create an interpreter over an explicit environment.
    pub fn with_env(config: ShellConfig, env: Environment) -> Self {
        Self {
            env,
            config,
            builtins: BuiltinTable::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Run the interactive loop on the terminal until `exit` or end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut source = RustylineSource::new()?;
        self.run_loop(&mut source, &mut std::io::stdout())
    }

    /// Drive the loop with any line source, writing shell output to `out`.
    ///
    /// Returns `Ok(())` after `exit` or at end of input. Failed commands never end
    /// the loop; only a broken front end or output stream does.
    pub fn run_loop(&mut self, source: &mut dyn LineSource, out: &mut dyn Write) -> Result<()> {
        self.trace(format_args!(
            "builtins: {}",
            self.builtins.names().collect::<Vec<_>>().join(", ")
        ));
        loop {
            out.flush()?;
            let Some(line) = source.read_line(&self.config.prompt)? else {
                self.trace("end of input");
                return Ok(());
            };
            if self.execute_line(&line, out)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Handle one raw line.
    ///
    /// Blank lines and lines with an empty stage (`"ls |"`) do nothing. Lexing and
    /// launch failures are reported on `out` as `shell: ...` lines.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        let lexed = match lexer::tokenize(line, &self.config) {
            Ok(lexed) => lexed,
            Err(err) => {
                writeln!(out, "shell: {}", err)?;
                return Ok(Flow::Continue);
            }
        };
        self.trace(format_args!("pipeline = {:?}", lexed.pipeline.stages()));
        if lexed.dropped_tokens > 0 {
            self.trace(format_args!(
                "dropped {} token(s) over the limit of {}",
                lexed.dropped_tokens, self.config.max_args
            ));
        }

        match self.classify(lexed.pipeline) {
            Some(decision) => {
                self.trace(format_args!("decision = {:?}", decision));
                self.execute(decision, out)
            }
            None => {
                self.trace("empty pipeline stage, nothing to run");
                Ok(Flow::Continue)
            }
        }
    }

    /// Decide how to run a pipeline. `None` when any stage is empty.
    pub fn classify(&self, pipeline: Pipeline) -> Option<ExecutionDecision> {
        if pipeline.has_empty_stage() {
            return None;
        }

        let mut stages = pipeline.into_stages().into_iter();
        let first = stages.next()?;
        if let Some(action) = first.program().and_then(|name| self.builtins.lookup(name)) {
            return Some(ExecutionDecision::Builtin(action));
        }

        Some(match stages.next() {
            Some(second) => ExecutionDecision::PipedExternal(first, second),
            None => ExecutionDecision::SingleExternal(first),
        })
    }

    fn execute(&mut self, decision: ExecutionDecision, out: &mut dyn Write) -> Result<Flow> {
        match decision {
            ExecutionDecision::Builtin(action) => {
                action.execute(out, &mut self.env)?;
            }
            ExecutionDecision::SingleExternal(segment) => {
                // Keep our own buffered output ahead of the child's.
                out.flush()?;
                match external::run_single(&segment, &self.env, Stdio::inherit()) {
                    Ok(code) => self.trace(format_args!("{} exited with {}", segment, code)),
                    Err(err) => writeln!(out, "shell: {}", err)?,
                }
            }
            ExecutionDecision::PipedExternal(first, second) => {
                out.flush()?;
                match external::run_piped(&first, &second, &self.env, Stdio::inherit()) {
                    Ok((a, b)) => self.trace(format_args!(
                        "{} exited with {}, {} exited with {}",
                        first, a, second, b
                    )),
                    Err(err) => writeln!(out, "shell: {}", err)?,
                }
            }
        }

        Ok(if self.env.should_exit {
            Flow::Exit
        } else {
            Flow::Continue
        })
    }

    fn trace(&self, msg: impl Display) {
        if self.config.trace {
            eprintln!("[trace] {}", msg);
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinAction;
    use crate::command::Segment;
    use crate::config::PipeOverflow;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Feeds a fixed list of lines, then reports end of input.
    struct ScriptedSource {
        lines: VecDeque<String>,
        prompts: usize,
    }

    impl ScriptedSource {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|s| s.to_string()).collect(),
                prompts: 0,
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
            self.prompts += 1;
            Ok(self.lines.pop_front())
        }
    }

    fn shell_with_user(user: Option<&str>) -> Interpreter {
        let mut env = Environment::new();
        env.remove_var("USER");
        if let Some(user) = user {
            env.set_var("USER", user);
        }
        Interpreter::with_env(ShellConfig::default(), env)
    }

    fn run_script(sh: &mut Interpreter, lines: &[&str]) -> (String, ScriptedSource) {
        let mut source = ScriptedSource::new(lines);
        let mut out = Vec::new();
        sh.run_loop(&mut source, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), source)
    }

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "interpreter_tests_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn classify_line(sh: &Interpreter, line: &str) -> Option<ExecutionDecision> {
        let lexed = lexer::tokenize(line, sh.config()).unwrap();
        sh.classify(lexed.pipeline)
    }

    #[test]
    fn test_classify_builtins_and_externals() {
        let sh = shell_with_user(None);

        assert_eq!(
            classify_line(&sh, "exit"),
            Some(ExecutionDecision::Builtin(BuiltinAction::Terminate))
        );
        assert_eq!(
            classify_line(&sh, "  hello  there "),
            Some(ExecutionDecision::Builtin(BuiltinAction::Greet))
        );
        assert_eq!(
            classify_line(&sh, "ls -la"),
            Some(ExecutionDecision::SingleExternal(Segment::new(["ls", "-la"])))
        );
        assert_eq!(
            classify_line(&sh, "echo hi | wc"),
            Some(ExecutionDecision::PipedExternal(
                Segment::new(["echo", "hi"]),
                Segment::new(["wc"])
            ))
        );
    }

    #[test]
    fn test_classify_builtin_swallows_second_stage() {
        let sh = shell_with_user(None);
        assert_eq!(
            classify_line(&sh, "exit | wc"),
            Some(ExecutionDecision::Builtin(BuiltinAction::Terminate))
        );
        assert_eq!(
            classify_line(&sh, "hello | cat"),
            Some(ExecutionDecision::Builtin(BuiltinAction::Greet))
        );
    }

    #[test]
    fn test_builtin_in_second_stage_is_external() {
        let sh = shell_with_user(None);
        assert_eq!(
            classify_line(&sh, "echo hi | exit"),
            Some(ExecutionDecision::PipedExternal(
                Segment::new(["echo", "hi"]),
                Segment::new(["exit"])
            ))
        );
    }

    #[test]
    fn test_classify_empty_stages() {
        let sh = shell_with_user(None);
        for line in ["", "   ", "|", "ls |", "| wc", "exit |"] {
            assert_eq!(classify_line(&sh, line), None, "line {:?}", line);
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut sh = shell_with_user(Some("alice"));
        let (out, source) = run_script(&mut sh, &["", "   ", "\t", "hello"]);
        assert_eq!(out, "Hello alice!\n");
        // Four lines plus the end-of-input read.
        assert_eq!(source.prompts, 5);
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let mut sh = shell_with_user(Some("alice"));
        let (out, source) = run_script(&mut sh, &["hello", "exit now please", "hello"]);
        assert_eq!(out, "Hello alice!\n");
        assert_eq!(source.lines.len(), 1, "line after exit must not be read");
        assert!(sh.env().should_exit);
    }

    #[test]
    fn test_exit_as_pipeline_source_skips_second_stage() {
        let tmp = make_unique_temp_dir("exitpipe");
        let marker = tmp.join("marker");
        let line = format!("exit | touch {}", marker.display());

        let mut sh = shell_with_user(None);
        let (out, _) = run_script(&mut sh, &[line.as_str()]);

        assert!(out.is_empty());
        assert!(sh.env().should_exit);
        assert!(!marker.exists());
        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_hello_with_and_without_user() {
        let mut sh = shell_with_user(Some("alice"));
        let mut out = Vec::new();
        assert_eq!(sh.execute_line("hello", &mut out).unwrap(), Flow::Continue);
        assert!(String::from_utf8(out).unwrap().contains("Hello alice!"));

        let mut sh = shell_with_user(None);
        let mut out = Vec::new();
        assert_eq!(sh.execute_line("hello", &mut out).unwrap(), Flow::Continue);
        assert_eq!(String::from_utf8(out).unwrap(), "Hello !\n");
    }

    #[test]
    fn test_end_of_input_ends_loop() {
        let mut sh = shell_with_user(None);
        let (out, source) = run_script(&mut sh, &[]);
        assert!(out.is_empty());
        assert_eq!(source.prompts, 1);
        assert!(!sh.env().should_exit);
    }

    #[test]
    fn test_unknown_command_reports_and_continues() {
        let mut sh = shell_with_user(Some("bob"));
        let (out, _) = run_script(&mut sh, &["doesnotexist123 --flag", "hello"]);
        assert_eq!(
            out,
            "shell: command not found: doesnotexist123\nHello bob!\n"
        );
    }

    #[test]
    fn test_unknown_command_in_pipeline_reports_and_continues() {
        let mut sh = shell_with_user(Some("bob"));
        let (out, _) = run_script(&mut sh, &["echo hi | doesnotexist123", "hello"]);
        assert_eq!(
            out,
            "shell: command not found: doesnotexist123\nHello bob!\n"
        );
    }

    #[test]
    fn test_long_line_reports_and_continues() {
        let long = "a".repeat(1001);
        let mut sh = shell_with_user(Some("bob"));
        let (out, _) = run_script(&mut sh, &[long.as_str(), "hello"]);
        assert_eq!(
            out,
            "shell: input line too long (1001 > 1000 characters)\nHello bob!\n"
        );
    }

    #[test]
    fn test_strict_pipes_rejects_third_stage() {
        let config = ShellConfig {
            pipe_overflow: PipeOverflow::Reject,
            ..ShellConfig::default()
        };
        let mut sh = Interpreter::with_env(config, Environment::empty());
        let mut out = Vec::new();
        assert_eq!(
            sh.execute_line("a | b | c", &mut out).unwrap(),
            Flow::Continue
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "shell: too many pipeline stages (3, at most 2 supported)\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_external_command_runs_before_next_prompt() {
        let tmp = make_unique_temp_dir("single");
        let marker = tmp.join("marker");

        struct CheckingSource {
            inner: ScriptedSource,
            marker: PathBuf,
            seen_on_second_read: Option<bool>,
        }

        impl LineSource for CheckingSource {
            fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
                if self.inner.prompts == 1 {
                    self.seen_on_second_read = Some(self.marker.exists());
                }
                self.inner.read_line(prompt)
            }
        }

        let line = format!("touch {}", marker.display());
        let mut source = CheckingSource {
            inner: ScriptedSource::new(&[line.as_str()]),
            marker: marker.clone(),
            seen_on_second_read: None,
        };

        let mut sh = Interpreter::default();
        let mut out = Vec::new();
        sh.run_loop(&mut source, &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(source.seen_on_second_read, Some(true));
        let _ = fs::remove_dir_all(tmp);
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_finishes_before_next_prompt() {
        let tmp = make_unique_temp_dir("piped");
        let captured = tmp.join("captured.txt");

        struct CheckingSource {
            inner: ScriptedSource,
            captured: PathBuf,
            seen_on_second_read: Option<String>,
        }

        impl LineSource for CheckingSource {
            fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
                if self.inner.prompts == 1 {
                    self.seen_on_second_read = fs::read_to_string(&self.captured).ok();
                }
                self.inner.read_line(prompt)
            }
        }

        let line = format!("echo   piped   words | tee {}", captured.display());
        let mut source = CheckingSource {
            inner: ScriptedSource::new(&[line.as_str(), "exit"]),
            captured: captured.clone(),
            seen_on_second_read: None,
        };

        let mut sh = Interpreter::default();
        let mut out = Vec::new();
        sh.run_loop(&mut source, &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(
            source.seen_on_second_read.as_deref(),
            Some("piped words\n")
        );
        let _ = fs::remove_dir_all(tmp);
    }
}
