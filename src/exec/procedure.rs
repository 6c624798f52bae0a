// src/exec/procedure.rs

//! Runs the ordered procedure list of one command instance.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, ScrollError};
use crate::exec::plugin::{NoPlugins, PluginDispatch};
use crate::exec::process::{ProcessRequest, ProcessRunner};
use crate::manifest::{ProcedureData, ProcedureMode, ProcedureSpec, WaitSpec};

/// Callback used by `command` procedures to enqueue another command.
pub type EnqueueFn = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Executes procedures against a process runner and a plugin dispatcher.
///
/// Cheap to clone; detached (`wait = false` / delayed) procedures run on a
/// clone inside their own Tokio task.
#[derive(Clone)]
pub struct ProcedureExecutor {
    runner: Arc<dyn ProcessRunner>,
    plugins: Arc<dyn PluginDispatch>,
}

impl ProcedureExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, plugins: Arc<dyn PluginDispatch>) -> Self {
        Self { runner, plugins }
    }

    /// Executor with no plugin subsystem attached.
    pub fn without_plugins(runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(runner, Arc::new(NoPlugins))
    }

    /// Run `procedures` of `command` in order.
    ///
    /// - A `command` procedure hands off to `enqueue` and ends the list.
    /// - `wait = false` and delayed procedures are detached; their results
    ///   are only logged.
    /// - A blocking procedure exiting non-zero aborts the list with
    ///   [`ScrollError::ProcedureFailed`] unless `ignore_failure` is set.
    /// - Dispatch errors always abort.
    pub async fn run(
        &self,
        command: &str,
        procedures: &[ProcedureSpec],
        enqueue: &EnqueueFn,
    ) -> Result<()> {
        for procedure in procedures {
            if procedure.mode == ProcedureMode::Command {
                return delegate(command, procedure, enqueue);
            }

            if !procedure.wait.is_blocking() {
                let delay = match procedure.wait {
                    WaitSpec::Delayed(secs) => Some(Duration::from_secs(secs)),
                    _ => None,
                };
                self.spawn_detached(command, procedure.clone(), delay);
                continue;
            }

            let exit_code = self.dispatch(procedure).await?;
            if exit_code == 0 {
                continue;
            }

            if procedure.ignore_failure {
                warn!(
                    command = %command,
                    procedure = %procedure.id,
                    exit_code,
                    "procedure failed; ignore_failure set, continuing"
                );
            } else {
                return Err(ScrollError::ProcedureFailed {
                    mode: procedure.mode.to_string(),
                    exit_code,
                });
            }
        }

        Ok(())
    }

    /// Dispatch a single procedure by mode and return its exit code.
    ///
    /// Stdin writes and plugin calls report `0` on success.
    pub async fn dispatch(&self, procedure: &ProcedureSpec) -> Result<i32> {
        debug!(procedure = %procedure.id, mode = %procedure.mode, "dispatching procedure");

        match (&procedure.mode, &procedure.data) {
            (ProcedureMode::Exec, ProcedureData::Argv(argv)) => {
                self.runner
                    .run(ProcessRequest {
                        name: procedure.id.clone(),
                        argv: argv.clone(),
                        tty: false,
                    })
                    .await
            }
            (ProcedureMode::ExecTty, ProcedureData::Argv(argv)) => {
                self.runner
                    .run(ProcessRequest {
                        name: procedure.id.clone(),
                        argv: argv.clone(),
                        tty: true,
                    })
                    .await
            }
            (ProcedureMode::Stdin, ProcedureData::Stdin { target, input }) => {
                self.runner.write_stdin(target, input).await?;
                Ok(0)
            }
            (ProcedureMode::Plugin(name), ProcedureData::Payload(payload)) => {
                if !self.plugins.handles(name) {
                    return Err(ScrollError::UnsupportedMode(procedure.mode.to_string()));
                }
                let result = self.plugins.dispatch(name, payload).await?;
                debug!(procedure = %procedure.id, plugin = %name, result = %result, "plugin call finished");
                Ok(0)
            }
            (ProcedureMode::Unsupported(mode), _) => {
                Err(ScrollError::UnsupportedMode(mode.clone()))
            }
            // `command` is handled by `run`; anything else is a mode/data mismatch.
            (mode, data) => Err(ScrollError::ManifestError(format!(
                "procedure '{}' cannot dispatch mode {mode} with data {data:?}",
                procedure.id
            ))),
        }
    }

    fn spawn_detached(&self, command: &str, procedure: ProcedureSpec, delay: Option<Duration>) {
        let executor = self.clone();
        let command = command.to_string();

        debug!(
            command = %command,
            procedure = %procedure.id,
            delay_secs = delay.map(|d| d.as_secs()),
            "running procedure in background"
        );

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match executor.dispatch(&procedure).await {
                Ok(0) => {
                    debug!(command = %command, procedure = %procedure.id, "background procedure finished");
                }
                Ok(exit_code) => {
                    warn!(
                        command = %command,
                        procedure = %procedure.id,
                        exit_code,
                        "background procedure exited non-zero"
                    );
                }
                Err(err) => {
                    error!(
                        command = %command,
                        procedure = %procedure.id,
                        error = %err,
                        "background procedure failed"
                    );
                }
            }
        });
    }
}

/// Hand the rest of the command over to another command.
fn delegate(command: &str, procedure: &ProcedureSpec, enqueue: &EnqueueFn) -> Result<()> {
    let ProcedureData::Command(target) = &procedure.data else {
        return Err(ScrollError::ManifestError(format!(
            "procedure '{}' has no target command",
            procedure.id
        )));
    };

    info!(command = %command, target = %target, "delegating to command");

    match enqueue(target) {
        Err(ScrollError::AlreadyCompletedOnce(_)) => {
            debug!(command = %command, target = %target, "delegated command already completed once");
            Ok(())
        }
        other => other,
    }
}
