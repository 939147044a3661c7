use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Snapshot of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: the variables handed to launched programs; `PATH` drives program search
///   and `USER` is what `hello` greets.
/// - `current_dir`: the working directory for launched programs.
/// - `should_exit`: raised by the `exit` builtin, checked by the dispatch loop.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, USER).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the dispatch loop stops before reading another line.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn new() -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// An environment with no variables at all, rooted at the current directory.
    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            should_exit: false,
        }
    }

    /// Get the value of a variable from the snapshot.
    ///
    /// Later changes to the real process environment are not seen.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override a variable in the snapshot.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Remove a variable from the snapshot.
    #[cfg(test)]
    pub(crate) fn remove_var(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
