//! Parent-side handle on one worker child process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::WorkerError;

use super::harness::WORKER_ENV_VAR;
use super::protocol::{from_line, to_line, ParentMessage, WorkerMessage};

/// How worker processes are launched. Selected once at pool start; both arms
/// are clean spawns (there is no safe in-runtime fork under tokio).
#[derive(Debug, Clone)]
pub enum LaunchStrategy {
    /// Re-exec the current executable in worker mode. Requires the embedding
    /// binary to call `worker::run_if_worker` early in `main`.
    CurrentExe,

    /// Spawn a dedicated worker harness command.
    Command { program: PathBuf, args: Vec<String> },
}

impl LaunchStrategy {
    fn build_command(&self) -> Result<Command, WorkerError> {
        let mut cmd = match self {
            LaunchStrategy::CurrentExe => {
                let exe = std::env::current_exe()
                    .map_err(|e| WorkerError::Spawn(format!("current_exe: {e}")))?;
                Command::new(exe)
            }
            LaunchStrategy::Command { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };
        cmd.env(WORKER_ENV_VAR, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Worker logs go to the parent's stderr unmodified.
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

/// One spawned worker: piped stdin/stdout speaking the line protocol.
pub struct WorkerSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    pid: u32,
}

impl WorkerSession {
    /// Spawns a worker and waits for its `worker.ready` line.
    pub async fn spawn(
        strategy: &LaunchStrategy,
        ready_timeout: Duration,
    ) -> Result<Self, WorkerError> {
        let mut child = strategy
            .build_command()?
            .spawn()
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Spawn("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn("no stdout".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(ready_timeout, lines.next_line())
            .await
            .map_err(|_| WorkerError::Ready(format!("no ready line within {ready_timeout:?}")))?
            .map_err(|e| WorkerError::Ready(e.to_string()))?
            .ok_or(WorkerError::StreamClosed)?;

        let pid = match from_line::<WorkerMessage>(&ready)? {
            WorkerMessage::Ready { pid, .. } => pid,
            other => {
                return Err(WorkerError::Protocol(format!(
                    "expected worker.ready, got {other:?}"
                )))
            }
        };

        tracing::debug!(target: "flowexec.worker", pid = pid, "worker ready");

        Ok(Self {
            child,
            stdin,
            stdout: lines,
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub async fn send(&mut self, msg: &ParentMessage) -> Result<(), WorkerError> {
        let line = to_line(msg);
        let write = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.write_all(b"\n").await?;
            self.stdin.flush().await
        };
        write.await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                WorkerError::StreamClosed
            } else {
                WorkerError::StreamIo {
                    stream: "stdin",
                    source: e,
                }
            }
        })
    }

    /// Next protocol line from the worker. `StreamClosed` on EOF means the
    /// process died or closed its stdout — both are crash-shaped.
    pub async fn recv(&mut self) -> Result<WorkerMessage, WorkerError> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| WorkerError::StreamIo {
                    stream: "stdout",
                    source: e,
                })?
                .ok_or(WorkerError::StreamClosed)?;
            if line.trim().is_empty() {
                continue;
            }
            return from_line(&line);
        }
    }

    /// Forcibly terminates the worker and reaps it.
    pub async fn kill(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    /// Graceful stop: shutdown line, bounded wait for exit, then kill.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.send(&ParentMessage::shutdown()).await;
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(target: "flowexec.worker", pid = self.pid, "worker ignored shutdown, killing");
                self.kill().await;
            }
        }
    }
}
