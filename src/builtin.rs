use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run directly in the shell process. They only ever see the first stage
/// of a pipeline, and their arguments are ignored.
pub(crate) trait BuiltinCommand {
    /// Canonical name of the command, e.g. "exit" or "hello".
    fn name() -> &'static str;

    /// Executes the command using the shell's output stream and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Stop the shell.
///
/// Raises [`Environment::should_exit`]; the dispatch loop returns as soon as it sees
/// the flag and the binary exits with status 0. No child is running at that point
/// because every launch is waited for before the next line is read.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

/// Greet the user named by `$USER`. An unset variable leaves the name blank.
pub struct Hello;

impl BuiltinCommand for Hello {
    fn name() -> &'static str {
        "hello"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let user = env.get_var("USER").unwrap_or_default();
        writeln!(stdout, "Hello {}!", user)?;
        Ok(0)
    }
}

/// Identifier of an in-process action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    /// `exit`
    Terminate,
    /// `hello`
    Greet,
}

impl BuiltinAction {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinAction::Terminate => Exit::name(),
            BuiltinAction::Greet => Hello::name(),
        }
    }

    pub fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match self {
            BuiltinAction::Terminate => Exit.execute(stdout, env),
            BuiltinAction::Greet => Hello.execute(stdout, env),
        }
    }
}

/// Fixed name-to-action mapping consulted before any external launch.
pub struct BuiltinTable {
    entries: &'static [BuiltinAction],
}

impl BuiltinTable {
    pub const fn new() -> Self {
        Self {
            entries: &[BuiltinAction::Terminate, BuiltinAction::Greet],
        }
    }

    /// Exact, case-sensitive match on the command name.
    pub fn lookup(&self, name: &str) -> Option<BuiltinAction> {
        self.entries.iter().copied().find(|a| a.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|a| a.name())
    }
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}
