//! Bounded execution of external tools.

use std::env;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::checker::CheckerError;

/// Interval between two checks whether a child process has exited.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Fails with [`CheckerError::Process`] unless the process exited successfully.
    pub fn ensure_success(self, program: &str) -> Result<Self, CheckerError> {
        if self.status.success() {
            return Ok(self);
        }
        Err(CheckerError::Process {
            program: program.to_string(),
            status: self.status.to_string(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Looks up `name` in `PATH`.
pub fn find_executable(name: &str) -> Result<PathBuf, CheckerError> {
    let not_found = || CheckerError::ExecutableNotFound(name.to_string());
    let path = env::var_os("PATH").ok_or_else(not_found)?;
    env::split_paths(&path)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(name)];
    if cfg!(windows) {
        candidates.push(dir.join(format!("{name}.exe")));
    }
    candidates
}

/// Number of polls before a process running for `timeout` is given up on.
pub fn poll_attempts(timeout: Duration) -> u32 {
    let attempts = timeout.as_millis() / POLL_INTERVAL.as_millis();
    u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
}

/// Runs `program` with `args`, feeding `stdin`, and waits at most `timeout`.
///
/// The child is polled every [`POLL_INTERVAL`] up to a fixed number of
/// attempts; when they are used up the child is killed.
pub fn run_command(
    program: &Path,
    args: &[String],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput, CheckerError> {
    let started = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    debug!("Spawned {} {}", program.display(), args.join(" "));

    let writer = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(input)) => {
            let input = input.to_string();
            Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
        }
        _ => None,
    };
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let Some(status) = wait_bounded(&mut child, poll_attempts(timeout))? else {
        // the pipes close with the child, which lets the reader threads finish
        let _ = child.kill();
        let _ = child.wait();
        return Err(CheckerError::Timeout {
            program: program.display().to_string(),
            timeout,
        });
    };

    if let Some(writer) = writer {
        // a tool may exit without reading all of its input
        let _ = writer.join();
    }
    let output = CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    debug!(
        "{} exited with {} after {:?}",
        program.display(),
        output.status,
        started.elapsed()
    );
    Ok(output)
}

fn wait_bounded(child: &mut Child, attempts: u32) -> Result<Option<ExitStatus>, CheckerError> {
    for _ in 0..attempts {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(child.try_wait()?)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
