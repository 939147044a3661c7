use crate::command::{ExitCode, Segment};
use crate::env::Environment;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Why an external command did not run to completion.
#[derive(Debug)]
pub enum LaunchError {
    /// A segment without tokens reached the launcher.
    EmptyCommand,
    /// The program could not be found or is not executable.
    CommandNotFound(String),
    /// The OS refused to create the child process.
    SpawnFailed { program: String, source: io::Error },
    /// The child was created but waiting for it failed.
    WaitFailed { program: String, source: io::Error },
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::EmptyCommand => write!(f, "empty command"),
            LaunchError::CommandNotFound(name) => write!(f, "command not found: {}", name),
            LaunchError::SpawnFailed { program, source } => {
                write!(f, "forking child failed for {}: {}", program, source)
            }
            LaunchError::WaitFailed { program, source } => {
                write!(f, "waiting for {} failed: {}", program, source)
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::SpawnFailed { source, .. } | LaunchError::WaitFailed { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Run one external command and block until it terminates.
///
/// Stdin and stderr are inherited from the shell; stdout goes to `stdout`.
pub fn run_single(
    segment: &Segment,
    env: &Environment,
    stdout: Stdio,
) -> Result<ExitCode, LaunchError> {
    let program = segment.program().ok_or(LaunchError::EmptyCommand)?;
    let mut cmd = prepare(segment, env)?;
    let child = cmd
        .stdout(stdout)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;
    wait_child(program, child)
}

/// Run `first | second` and block until both terminate.
///
/// The two children run concurrently. The shell keeps no end of the pipe: the
/// write end lives only in `first`, and the read end is handed to `second` and
/// released here before waiting, so `second` sees end-of-input once `first` exits.
///
/// If `first` cannot be launched, `second` is not attempted. If `second` cannot be
/// launched, `first` is still waited for (it gets `EPIPE` on its next write) before
/// the error is returned.
pub fn run_piped(
    first: &Segment,
    second: &Segment,
    env: &Environment,
    stdout: Stdio,
) -> Result<(ExitCode, ExitCode), LaunchError> {
    let first_name = first.program().ok_or(LaunchError::EmptyCommand)?;
    let mut first_cmd = prepare(first, env)?;
    let mut first_child = first_cmd
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(first_name, e))?;
    drop(first_cmd);

    // `Stdio::piped()` always yields a handle on a successful spawn.
    let channel = first_child.stdout.take().map(Stdio::from);

    let second_child = match (second.program(), channel) {
        (Some(second_name), Some(channel)) => prepare(second, env).and_then(|mut cmd| {
            cmd.stdin(channel)
                .stdout(stdout)
                .spawn()
                .map_err(|e| spawn_error(second_name, e))
        }),
        (Some(second_name), None) => Err(LaunchError::SpawnFailed {
            program: second_name.to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe to first stage is missing"),
        }),
        (None, _) => Err(LaunchError::EmptyCommand),
    };

    let second_child = match second_child {
        Ok(child) => child,
        Err(err) => {
            // Reap the first stage before reporting; its own failure is secondary.
            let _ = wait_child(first_name, first_child);
            return Err(err);
        }
    };

    let first_code = wait_child(first_name, first_child);
    let second_code = wait_child(second.program().unwrap_or_default(), second_child);
    Ok((first_code?, second_code?))
}

/// Resolve the program of `segment` and build a [`Command`] for it.
fn prepare(segment: &Segment, env: &Environment) -> Result<Command, LaunchError> {
    let program = segment.program().ok_or(LaunchError::EmptyCommand)?;
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let executable = find_command_path(OsStr::new(&search_paths), Path::new(program))
        .ok_or_else(|| LaunchError::CommandNotFound(program.to_string()))?;

    let mut cmd = Command::new(executable.as_os_str());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(program);
    }
    cmd.args(segment.args())
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir);
    Ok(cmd)
}

/// Only resource exhaustion counts as a failure to create the child. Anything
/// else (missing file, no permission, `ENOEXEC` for a bad image) means the program
/// could not be executed.
fn spawn_error(program: &str, err: io::Error) -> LaunchError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => LaunchError::SpawnFailed {
            program: program.to_string(),
            source: err,
        },
        _ => LaunchError::CommandNotFound(program.to_string()),
    }
}

fn wait_child(program: &str, mut child: Child) -> Result<ExitCode, LaunchError> {
    let status = child.wait().map_err(|source| LaunchError::WaitFailed {
        program: program.to_string(),
        source,
    })?;
    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh`): same, relative to the current dir.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: same.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir {
        if let Some(found) = find_by_path(path) {
            return Some(Cow::Borrowed(found));
        }
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
