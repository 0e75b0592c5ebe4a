use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Exited { code: Option<i32>, success: bool },
    TimedOut,
}

impl ProcessExit {
    fn from_status(status: ExitStatus) -> Self {
        Self::Exited {
            code: status.code(),
            success: status.success(),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { success: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub exit: ProcessExit,
    /// Last lines written to stderr, oldest first.
    pub stderr_tail: Vec<String>,
}

impl ProcessReport {
    pub fn describe_failure(&self) -> String {
        let status = match self.exit {
            ProcessExit::Exited { code: Some(code), .. } => format!("exited with status {code}"),
            ProcessExit::Exited { code: None, .. } => "terminated by signal".to_string(),
            ProcessExit::TimedOut => "timed out".to_string(),
        };
        match self.stderr_tail.last() {
            Some(line) => format!("{status}: {line}"),
            None => status,
        }
    }
}

/// Runs `command` and hands every output line to `on_line` as it arrives. With a
/// timeout the child is killed once the deadline passes.
pub fn run_streaming(
    command: &mut Command,
    timeout: Option<Duration>,
    on_line: &mut dyn FnMut(OutputStream, &str),
) -> Result<ProcessReport> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to launch '{program}'"))?;

    let (sender, receiver) = mpsc::channel();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, OutputStream::Stdout, sender.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, OutputStream::Stderr, sender));
    }

    let deadline = timeout.map(|limit| Instant::now() + limit);
    let mut stderr_tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut timed_out = false;

    loop {
        let received = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    timed_out = true;
                    break;
                }
                receiver.recv_timeout(remaining)
            }
            None => receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok((stream, line)) => {
                if stream == OutputStream::Stderr {
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line.clone());
                }
                on_line(stream, &line);
            }
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if timed_out {
        warn!(program = %program, "process exceeded its time limit, killing it");
        if let Err(err) = child.kill() {
            debug!(program = %program, error = %err, "kill after timeout failed");
        }
        child
            .wait()
            .with_context(|| format!("failed to reap '{program}'"))?;
        // Grandchildren may still hold the pipes open; the readers are left detached.
        return Ok(ProcessReport {
            exit: ProcessExit::TimedOut,
            stderr_tail: stderr_tail.into(),
        });
    }

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for '{program}'"))?;
    for reader in readers {
        let _ = reader.join();
    }

    Ok(ProcessReport {
        exit: ProcessExit::from_status(status),
        stderr_tail: stderr_tail.into(),
    })
}

fn spawn_reader<R>(
    pipe: R,
    stream: OutputStream,
    sender: Sender<(OutputStream, String)>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if sender.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
