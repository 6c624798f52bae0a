// src/exec/process.rs

//! OS process runner.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScrollError};
use crate::exec::BoxFuture;

/// A process the executor wants started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Process table key (the procedure's status id).
    pub name: String,
    pub argv: Vec<String>,
    /// Whether the process is tty-backed (`exec-tty`).
    pub tty: bool,
}

/// Starts, stops and feeds OS processes.
pub trait ProcessRunner: Send + Sync {
    /// Start the process and wait for it to exit, returning the exit code.
    fn run(&self, request: ProcessRequest) -> BoxFuture<'_, Result<i32>>;

    /// Write `input` to the standard input of a running process.
    ///
    /// Pipe-backed processes get a line; tty-backed processes get the raw
    /// bytes. Fails with [`ScrollError::ProcessNotFound`] if nothing by that
    /// name is running.
    fn write_stdin<'a>(&'a self, process: &'a str, input: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Ask a running process to stop. Returns `false` if it was not running.
    fn stop(&self, process: &str) -> bool;

    /// Names of currently running processes.
    fn running(&self) -> Vec<String>;
}

/// Internal handle for a running process.
///
/// - `generation` tells two runs of the same name apart so a finished run
///   never removes its successor from the table.
/// - `cancel` is used by `stop` to kill the process.
struct RunningProcess {
    generation: u64,
    tty: bool,
    stdin: Option<Arc<tokio::sync::Mutex<ChildStdin>>>,
    cancel: Option<oneshot::Sender<()>>,
}

/// Production runner built on `tokio::process`.
///
/// Per process name there is at most one running process: starting a second
/// process under a running name stops the previous instance.
#[derive(Clone, Default)]
pub struct TokioProcessRunner {
    table: Arc<Mutex<HashMap<String, RunningProcess>>>,
    generation: Arc<AtomicU64>,
    working_dir: Option<PathBuf>,
}

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run processes from `dir` instead of the daemon's working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Stop every running process.
    pub fn stop_all(&self) -> usize {
        let names = self.running();
        names.iter().filter(|name| self.stop(name)).count()
    }

    async fn run_inner(&self, request: ProcessRequest) -> Result<i32> {
        let (program, args) = request.argv.split_first().ok_or_else(|| {
            ScrollError::ManifestError(format!("process '{}' has an empty argv", request.name))
        })?;

        info!(
            process = %request.name,
            tty = request.tty,
            argv = ?request.argv,
            "starting process"
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process '{}'", request.name))?;

        spawn_output_logger(&request.name, "stdout", child.stdout.take());
        spawn_output_logger(&request.name, "stderr", child.stderr.take());

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.table.lock().insert(
            request.name.clone(),
            RunningProcess {
                generation,
                tty: request.tty,
                stdin: child
                    .stdin
                    .take()
                    .map(|stdin| Arc::new(tokio::sync::Mutex::new(stdin))),
                cancel: Some(cancel_tx),
            },
        );
        if let Some(mut previous) = previous {
            warn!(
                process = %request.name,
                "process with this name still running; stopping previous instance"
            );
            if let Some(cancel) = previous.cancel.take() {
                let _ = cancel.send(());
            }
        }

        // Either the process exits on its own, or `stop` asks us to kill it.
        let result = tokio::select! {
            status_res = child.wait() => {
                status_res
                    .with_context(|| format!("waiting for process '{}'", request.name))
                    .map_err(ScrollError::from)
                    .map(|status| {
                        let code = status.code().unwrap_or(-1);
                        info!(
                            process = %request.name,
                            exit_code = code,
                            success = status.success(),
                            "process exited"
                        );
                        code
                    })
            }

            cancel = &mut cancel_rx => {
                if cancel.is_ok() {
                    info!(process = %request.name, "stop requested; killing process");
                    if let Err(e) = child.kill().await {
                        warn!(process = %request.name, error = %e, "failed to kill process");
                    }
                }
                Err(ScrollError::Terminated(request.name.clone()))
            }
        };

        let mut table = self.table.lock();
        if table
            .get(&request.name)
            .is_some_and(|p| p.generation == generation)
        {
            table.remove(&request.name);
        }

        result
    }

    async fn write_stdin_inner(&self, process: &str, input: &str) -> Result<()> {
        let (stdin, tty) = {
            let table = self.table.lock();
            let entry = table
                .get(process)
                .ok_or_else(|| ScrollError::ProcessNotFound(process.to_string()))?;
            let stdin = entry
                .stdin
                .clone()
                .ok_or_else(|| ScrollError::ProcessNotFound(process.to_string()))?;
            (stdin, entry.tty)
        };

        let mut stdin = stdin.lock().await;
        if tty {
            stdin.write_all(input.as_bytes()).await?;
        } else {
            stdin.write_all(input.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }
        stdin.flush().await?;

        debug!(process = %process, tty, bytes = input.len(), "wrote to stdin");
        Ok(())
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, request: ProcessRequest) -> BoxFuture<'_, Result<i32>> {
        Box::pin(self.run_inner(request))
    }

    fn write_stdin<'a>(&'a self, process: &'a str, input: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write_stdin_inner(process, input))
    }

    fn stop(&self, process: &str) -> bool {
        let cancel = self
            .table
            .lock()
            .get_mut(process)
            .and_then(|p| p.cancel.take());

        match cancel {
            Some(cancel) => cancel.send(()).is_ok(),
            None => false,
        }
    }

    fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Consume a child output stream so buffers don't fill; log lines at debug.
fn spawn_output_logger<R>(process: &str, stream: &'static str, reader: Option<R>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let Some(reader) = reader else {
        return;
    };
    let process = process.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(process = %process, stream, "{}", line);
        }
    });
}
