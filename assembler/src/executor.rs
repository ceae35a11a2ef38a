use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::ExecutionError;
use crate::wrap::{AssembledScript, CLEANUP_FAILURE_MARKER};

/// Outcome of running one script. Only used to decide pass or fail.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit code; `None` when the interpreter was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// The epilogue reported that cleanup failed.
    pub cleanup_failed: bool,
}

/// Runs scripts as `<interpreter> -c <script>`, one at a time.
#[derive(Debug, Clone)]
pub struct Executor {
    interpreter: String,
    timeout: Option<Duration>,
}

impl Executor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Executor {
            interpreter: interpreter.into(),
            timeout: None,
        }
    }

    /// Kill scripts that run longer than `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a script to completion and capture its output.
    ///
    /// Both pipes are drained on helper threads while the child runs so a
    /// chatty script cannot block on a full pipe. With a timeout the
    /// interpreter leads its own process group, and expiry kills the whole
    /// group so subprocesses holding the pipes cannot outlive the limit.
    #[instrument(skip_all, fields(interpreter = %self.interpreter, origin = %script.origin))]
    pub fn run(&self, script: &AssembledScript) -> Result<ExecutionResult, ExecutionError> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(&script.text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if self.timeout.is_some() {
                command.process_group(0);
            }
        }

        let mut child = command
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;
        debug!(pid = child.id(), "spawned interpreter");

        let stdout = child.stdout.take().ok_or(ExecutionError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ExecutionError::MissingPipe("stderr"))?;
        let stdout_handle = thread::spawn(move || read_stream(stdout, "stdout"));
        let stderr_handle = thread::spawn(move || read_stream(stderr, "stderr"));

        let mut timed_out = false;
        let status = match self.timeout {
            None => child.wait().map_err(ExecutionError::Wait)?,
            Some(timeout) => match child.wait_timeout(timeout).map_err(ExecutionError::Wait)? {
                Some(status) => status,
                None => {
                    warn!(timeout_secs = timeout.as_secs(), "script timed out, killing");
                    timed_out = true;
                    kill_process_group(&mut child).map_err(ExecutionError::Kill)?;
                    child.wait().map_err(ExecutionError::Wait)?
                }
            },
        };

        let stdout = join_output(stdout_handle)?;
        let stderr = join_output(stderr_handle)?;

        let cleanup_failed = stderr.contains(CLEANUP_FAILURE_MARKER);
        if cleanup_failed {
            warn!("cleanup epilogue failed; later scripts may see leftover state");
        }

        let success = status.success() && !timed_out;
        info!(code = ?status.code(), success, timed_out, "script finished");

        Ok(ExecutionResult {
            code: status.code(),
            success,
            stdout,
            stderr,
            timed_out,
            cleanup_failed,
        })
    }
}

/// Kill the interpreter and everything it started.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let pgid = child.id() as libc::pid_t;
    // The child was spawned with `process_group(0)`, so its pid is the group id.
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn read_stream(mut stream: impl Read, name: &'static str) -> Result<String, ExecutionError> {
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|source| ExecutionError::Read {
            stream: name,
            source,
        })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join_output(
    handle: thread::JoinHandle<Result<String, ExecutionError>>,
) -> Result<String, ExecutionError> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(ExecutionError::ReaderPanicked),
    }
}
