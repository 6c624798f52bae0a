use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use scrolld::errors::{Result, ScrollError};
use scrolld::exec::{BoxFuture, ProcessRequest, ProcessRunner};

/// A fake process runner that:
/// - records every process it was asked to start
/// - "runs" each process by sleeping for its configured delay (default 0)
/// - exits with the configured exit code (default 0)
/// - keeps a running table so `stdin` procedures and `stop` behave like the
///   real runner.
#[derive(Default)]
pub struct FakeProcessRunner {
    runs: Mutex<Vec<ProcessRequest>>,
    exit_codes: Mutex<HashMap<String, i32>>,
    delays: Mutex<HashMap<String, Duration>>,
    running: Mutex<HashMap<String, Arc<Notify>>>,
    stdin_writes: Mutex<Vec<(String, String)>>,
}

impl FakeProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(self, process: &str, code: i32) -> Self {
        self.set_exit_code(process, code);
        self
    }

    pub fn with_delay(self, process: &str, delay: Duration) -> Self {
        self.set_delay(process, delay);
        self
    }

    /// Change the exit code of later runs of `process`.
    pub fn set_exit_code(&self, process: &str, code: i32) {
        self.exit_codes.lock().insert(process.to_string(), code);
    }

    pub fn set_delay(&self, process: &str, delay: Duration) {
        self.delays.lock().insert(process.to_string(), delay);
    }

    pub fn runs(&self) -> Vec<ProcessRequest> {
        self.runs.lock().clone()
    }

    /// Process names in start order.
    pub fn run_names(&self) -> Vec<String> {
        self.runs.lock().iter().map(|r| r.name.clone()).collect()
    }

    pub fn run_count(&self, process: &str) -> usize {
        self.runs.lock().iter().filter(|r| r.name == process).count()
    }

    /// `(process, input)` pairs written through `write_stdin`.
    pub fn stdin_writes(&self) -> Vec<(String, String)> {
        self.stdin_writes.lock().clone()
    }

    async fn run_inner(&self, request: ProcessRequest) -> Result<i32> {
        let name = request.name.clone();
        let delay = self.delays.lock().get(&name).copied().unwrap_or_default();
        let code = self.exit_codes.lock().get(&name).copied().unwrap_or(0);

        let stop = Arc::new(Notify::new());
        self.runs.lock().push(request);
        self.running.lock().insert(name.clone(), Arc::clone(&stop));

        let result = tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(code),
            _ = stop.notified() => Err(ScrollError::Terminated(name.clone())),
        };

        let mut running = self.running.lock();
        if running.get(&name).is_some_and(|n| Arc::ptr_eq(n, &stop)) {
            running.remove(&name);
        }

        result
    }
}

impl ProcessRunner for FakeProcessRunner {
    fn run(&self, request: ProcessRequest) -> BoxFuture<'_, Result<i32>> {
        Box::pin(self.run_inner(request))
    }

    fn write_stdin<'a>(&'a self, process: &'a str, input: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.running.lock().contains_key(process) {
                return Err(ScrollError::ProcessNotFound(process.to_string()));
            }
            self.stdin_writes
                .lock()
                .push((process.to_string(), input.to_string()));
            Ok(())
        })
    }

    fn stop(&self, process: &str) -> bool {
        match self.running.lock().get(process) {
            Some(stop) => {
                stop.notify_one();
                true
            }
            None => false,
        }
    }

    fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
