//! Bounded execution of external commands and in-process closures.
//!
//! Nothing here retries. A timed-out command is killed; a timed-out closure is
//! abandoned and whatever it eventually returns is dropped with its channel.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Ok(T),
    Failed { code: i32, message: String },
    TimedOut,
    /// The target could not be found: an unknown program or phase.
    NotFound(String),
}

impl<T> TaskOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TaskOutcome<U> {
        match self {
            TaskOutcome::Ok(v) => TaskOutcome::Ok(f(v)),
            TaskOutcome::Failed { code, message } => TaskOutcome::Failed { code, message },
            TaskOutcome::TimedOut => TaskOutcome::TimedOut,
            TaskOutcome::NotFound(t) => TaskOutcome::NotFound(t),
        }
    }

    pub fn into_result(self, what: &str, timeout: Duration) -> Result<T, TaskError> {
        match self {
            TaskOutcome::Ok(v) => Ok(v),
            TaskOutcome::Failed { code, message } => Err(TaskError::Failed {
                what: what.to_string(),
                code,
                message,
            }),
            TaskOutcome::TimedOut => Err(TaskError::TimedOut {
                what: what.to_string(),
                secs: timeout.as_secs_f64(),
            }),
            TaskOutcome::NotFound(target) => Err(TaskError::NotFound(target)),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("{what} failed with exit code {code}: {message}")]
    Failed {
        what: String,
        code: i32,
        message: String,
    },
    #[error("{what} timed out after {secs}s")]
    TimedOut { what: String, secs: f64 },
    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program args...` and waits at most `timeout`.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> TaskOutcome<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    run_prepared(cmd, program, timeout)
}

/// Like [`run_command`] for a command the caller has already configured
/// (working directory, environment).
pub fn run_prepared(mut cmd: Command, label: &str, timeout: Duration) -> TaskOutcome<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return TaskOutcome::NotFound(label.to_string());
        }
        Err(e) => {
            return TaskOutcome::Failed {
                code: -1,
                message: format!("cannot spawn {}: {}", label, e),
            };
        }
    };

    let stdout = child.stdout.take().map(|mut s| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            buf
        })
    });
    let stderr = child.stderr.take().map(|mut s| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            buf
        })
    });
    let collect = |h: Option<thread::JoinHandle<Vec<u8>>>| {
        h.and_then(|h| h.join().ok())
            .map(|b| String::from_utf8_lossy(&b).to_string())
            .unwrap_or_default()
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let out = CommandOutput {
                    stdout: collect(stdout),
                    stderr: collect(stderr),
                };
                if status.success() {
                    return TaskOutcome::Ok(out);
                }
                return TaskOutcome::Failed {
                    code: status.code().unwrap_or(-1),
                    message: out.stderr.trim().to_string(),
                };
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::warn!("{} killed after {:?}", label, timeout);
                    return TaskOutcome::TimedOut;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return TaskOutcome::Failed {
                    code: -1,
                    message: format!("cannot wait on {}: {}", label, e),
                };
            }
        }
    }
}

/// Runs `f` on a worker thread and waits at most `timeout` for its result.
///
/// An `Err` from `f` and a panic both become `Failed { code: -1 }`.
pub fn run_bounded<T, F>(timeout: Duration, f: F) -> TaskOutcome<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    let spawned = thread::Builder::new()
        .name("canon-phase".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        });
    if let Err(e) = spawned {
        return TaskOutcome::Failed {
            code: -1,
            message: format!("cannot start worker: {}", e),
        };
    }
    match rx.recv_timeout(timeout) {
        Ok(Ok(v)) => TaskOutcome::Ok(v),
        Ok(Err(e)) => TaskOutcome::Failed {
            code: -1,
            message: format!("{:#}", e),
        },
        Err(crossbeam_channel::RecvTimeoutError::Timeout) => TaskOutcome::TimedOut,
        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => TaskOutcome::Failed {
            code: -1,
            message: "phase panicked".to_string(),
        },
    }
}
