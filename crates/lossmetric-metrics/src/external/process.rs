//! Child process execution with captured output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

/// Outcome classification of an external run.
///
/// The numeric values are part of the result contract
/// (`external:error_code`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExternalErrorCode {
    /// The program ran and its output parsed.
    Success = 0,
    /// Output pipes could not be set up.
    PipeError = 1,
    /// The child process could not be created or waited on.
    ForkError = 2,
    /// The program image could not be executed.
    ExecError = 3,
    /// Standard output did not follow the wire protocol.
    FormatError = 4,
    /// The datasets could not be serialized for the program.
    IoError = 5,
}

impl ExternalErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExternalErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExternalErrorCode::Success => "success",
            ExternalErrorCode::PipeError => "pipe_error",
            ExternalErrorCode::ForkError => "fork_error",
            ExternalErrorCode::ExecError => "exec_error",
            ExternalErrorCode::FormatError => "format_error",
            ExternalErrorCode::IoError => "io_error",
        };
        f.write_str(name)
    }
}

/// Exit code reported for a program that could not be executed.
pub const EXEC_FAILURE_STATUS: i32 = 255;

/// Captured result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Everything the program wrote to standard output.
    pub stdout: String,
    /// Everything the program wrote to standard error.
    pub stderr: String,
    /// Exit code; `-1` if the child was terminated by a signal.
    pub return_code: i32,
    /// Runner-level classification.
    pub error_code: ExternalErrorCode,
}

impl ProcessOutcome {
    /// Creates an outcome for a runner-level failure with no captured output.
    pub fn failure(error_code: ExternalErrorCode, return_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            return_code,
            error_code,
        }
    }

    /// Creates the outcome of a program that could not be executed.
    ///
    /// This mirrors a child that failed to replace its image: the diagnostic
    /// goes to stderr and the exit code is [`EXEC_FAILURE_STATUS`], so callers
    /// observe it as an ordinary failing run.
    pub fn exec_failure(program: &str, error: &std::io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("{}: failed to exec process: {}\n", program, error),
            return_code: EXEC_FAILURE_STATUS,
            error_code: ExternalErrorCode::ExecError,
        }
    }
}

/// Capability to run a command line and capture its output.
///
/// `argv[0]` is the program, looked up on `PATH`; the rest are its
/// arguments. Implementations block until the program has exited.
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, argv: &[String]) -> ProcessOutcome;
}

/// Runs commands as real child processes.
///
/// Stdin is closed. Stdout is drained on the calling thread while stderr is
/// drained on a helper thread, so a chatty program cannot deadlock on a full
/// pipe. Both streams reach end-of-file before the child is reaped. No
/// timeout is applied: a program that never exits blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, argv: &[String]) -> ProcessOutcome {
        let Some((program, args)) = argv.split_first() else {
            let error = std::io::Error::new(std::io::ErrorKind::NotFound, "empty command");
            return ProcessOutcome::exec_failure("", &error);
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if is_fork_failure(&e) => {
                tracing::warn!(program = %program, error = %e, "failed to spawn external program");
                return ProcessOutcome::failure(ExternalErrorCode::ForkError, -1);
            }
            Err(e) => {
                tracing::warn!(program = %program, error = %e, "failed to exec external program");
                return ProcessOutcome::exec_failure(program, &e);
            }
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = wait_for_exit(&mut child);
                return ProcessOutcome::failure(ExternalErrorCode::PipeError, -1);
            }
        };

        let stderr_drain = thread::Builder::new()
            .name("external-stderr".to_string())
            .spawn(move || read_all(stderr));
        let stdout_bytes = read_all(stdout);

        let stderr_bytes = match stderr_drain {
            Ok(handle) => handle.join().ok(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to start stderr reader");
                None
            }
        };

        let status = match wait_for_exit(&mut child) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(program = %program, error = %e, "failed to wait for external program");
                return ProcessOutcome::failure(ExternalErrorCode::ForkError, -1);
            }
        };

        let Some(stderr_bytes) = stderr_bytes else {
            return ProcessOutcome::failure(ExternalErrorCode::PipeError, status.code().unwrap_or(-1));
        };

        tracing::debug!(
            program = %program,
            status = ?status.code(),
            stdout_bytes = stdout_bytes.len(),
            stderr_bytes = stderr_bytes.len(),
            "external program finished"
        );

        ProcessOutcome {
            stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            return_code: status.code().unwrap_or(-1),
            error_code: ExternalErrorCode::Success,
        }
    }
}

/// Whether a spawn error means no child process could be created at all.
///
/// Only resource exhaustion (`EAGAIN`, `ENOMEM`) qualifies. Every other error
/// comes from loading the program image (missing file, no permission, bad
/// executable format, busy text file) and is reported as an exec failure.
fn is_fork_failure(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::OutOfMemory
    )
}

fn read_all(mut stream: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf) {
        tracing::warn!(error = %e, "error while reading external program output");
    }
    buf
}

/// Waits for the child to exit, retrying if the wait is interrupted.
fn wait_for_exit(child: &mut Child) -> std::io::Result<ExitStatus> {
    loop {
        match child.wait() {
            Ok(status) => return Ok(status),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
