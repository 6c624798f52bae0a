// src/engine/scheduler.rs

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dag::{CommandQueue, Launch, StatusWrite};
use crate::engine::watchers::DrainWatchers;
use crate::engine::{CommandName, CompletionOutcome, Trigger};
use crate::errors::Result;
use crate::exec::{EnqueueFn, ProcedureExecutor};
use crate::manifest::CommandLookup;
use crate::status::{StatusRecord, StatusStore};
use crate::types::CommandStatus;

/// State shared by the scheduler handle, the work loop and launch tasks.
///
/// Lock order: `scan_lock` before `queue` before `store`.
struct Shared {
    /// Serialises scan passes end to end, and completion transitions
    /// against them.
    scan_lock: Mutex<()>,
    queue: Mutex<CommandQueue>,
    store: Mutex<Box<dyn StatusStore>>,
    executor: ProcedureExecutor,
    trigger_tx: mpsc::UnboundedSender<Trigger>,
    watchers: DrainWatchers,
}

/// Dependency scheduler handle.
///
/// Cheap to clone. The work loop is a single Tokio task that wakes on every
/// [`Trigger`], runs one scan pass, then reports the pending set to drainers.
/// Every launched command runs in its own Tokio task.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queue", &*self.shared.queue.lock())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Build the scheduler and spawn its work loop.
    ///
    /// The queue is seeded from the store's record first, so `Once` commands
    /// completed by an earlier daemon stay completed and interrupted commands
    /// are resumed. Must be called inside a Tokio runtime.
    pub fn start(
        lookup: Arc<dyn CommandLookup>,
        executor: ProcedureExecutor,
        store: Box<dyn StatusStore>,
    ) -> Self {
        let mut queue = CommandQueue::new(lookup);
        let resumed = queue.restore(store.read());
        if !resumed.is_empty() {
            info!(?resumed, "resuming commands interrupted by a previous run");
        }

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            scan_lock: Mutex::new(()),
            queue: Mutex::new(queue),
            store: Mutex::new(store),
            executor,
            trigger_tx,
            watchers: DrainWatchers::new(),
        });

        if !resumed.is_empty() {
            shared.signal(Trigger::Drain);
        }

        let handle = tokio::spawn(work_loop(Arc::clone(&shared), trigger_rx));

        Self {
            shared,
            handle: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Queue `name` for execution. Does not wait for it to run.
    ///
    /// Errors: `CommandNotFound`, `AlreadyQueued`, `AlreadyCompletedOnce`.
    pub fn enqueue(&self, name: &str, persist: bool) -> Result<()> {
        self.shared.enqueue(name, persist)
    }

    /// Block until a scan reports no `Waiting` or `Running` command.
    ///
    /// Never returns while a `Restart` command is queued, or while a command
    /// waits on a failed dependency. Returns early if the scheduler shuts down.
    pub async fn drain_all(&self) {
        self.wait_until(|queue| queue.pending().is_empty()).await;
    }

    /// Block until `name` and its transitive `needs` are all terminal.
    pub async fn drain(&self, name: &str) {
        self.wait_until(|queue| !queue.closure_pending(name)).await;
    }

    /// Stop the work loop after its current pass. Running launch tasks are
    /// left alone.
    pub fn shutdown(&self) {
        info!("scheduler shutdown requested");
        self.shared.signal(Trigger::Shutdown);
    }

    /// Wait for the work loop to exit (after [`Scheduler::shutdown`]).
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler work loop panicked");
            }
        }
    }

    pub fn snapshot(&self) -> BTreeMap<CommandName, CommandStatus> {
        self.shared.queue.lock().snapshot()
    }

    pub fn status_of(&self, name: &str) -> Option<CommandStatus> {
        self.shared.queue.lock().status_of(name)
    }

    /// Copy of the record as last recorded by the status store. A file
    /// store keeps a change in memory even when writing it to disk failed.
    pub fn persisted(&self) -> StatusRecord {
        self.shared.store.lock().read().clone()
    }

    pub fn launch_count(&self, name: &str) -> u64 {
        self.shared.queue.lock().launch_count(name)
    }

    /// Commands stuck behind a failed, non-restart dependency.
    pub fn stalled(&self) -> Vec<CommandName> {
        self.shared.queue.lock().stalled()
    }

    pub fn evict_terminal(&self) -> Vec<CommandName> {
        let _scan = self.shared.scan_lock.lock();
        self.shared.queue.lock().evict_terminal()
    }

    async fn wait_until<F>(&self, done: F)
    where
        F: Fn(&CommandQueue) -> bool,
    {
        let (id, mut rx) = self.shared.watchers.subscribe();
        debug!(drainers = self.shared.watchers.len(), "drain watcher registered");
        self.shared.signal(Trigger::Drain);

        loop {
            if rx.changed().await.is_err() {
                debug!("drain watcher closed; scheduler stopped");
                break;
            }
            if done(&*self.shared.queue.lock()) {
                break;
            }
        }

        self.shared.watchers.unsubscribe(id);
    }
}

impl Shared {
    fn enqueue(&self, name: &str, persist: bool) -> Result<()> {
        {
            let _scan = self.scan_lock.lock();
            let write = self.queue.lock().enqueue(name, persist)?;
            if let Some(write) = write {
                self.persist(&write);
            }
        }

        info!(command = %name, persist, "command enqueued");
        self.signal(Trigger::Enqueued(name.to_string()));
        Ok(())
    }

    fn signal(&self, trigger: Trigger) {
        if self.trigger_tx.send(trigger).is_err() {
            debug!("work loop stopped; trigger dropped");
        }
    }

    /// Mirror a transition into the store. Failures are logged only.
    ///
    /// Runs under `scan_lock`, so a file store's synchronous write blocks
    /// this worker thread. Writes happen once per status transition.
    fn persist(&self, write: &StatusWrite) {
        if let Err(err) = self.store.lock().set_status(&write.name, write.status) {
            warn!(
                command = %write.name,
                status = %write.status,
                error = %err,
                "failed to persist command status"
            );
        }
    }

    fn scan(self: &Arc<Self>) {
        let _scan = self.scan_lock.lock();
        let step = self.queue.lock().scan();

        for write in &step.writes {
            self.persist(write);
        }

        for dep in step.discovered {
            self.signal(Trigger::Enqueued(dep));
        }

        for launch in step.launches {
            self.launch(launch);
        }
    }

    fn launch(self: &Arc<Self>, launch: Launch) {
        let shared = Arc::clone(self);
        info!(command = %launch.name, "launching command");

        tokio::spawn(async move {
            let enqueue: EnqueueFn = {
                let shared = Arc::clone(&shared);
                Arc::new(move |name: &str| shared.enqueue(name, false))
            };

            let result = shared
                .executor
                .run(&launch.name, &launch.spec.procedures, &enqueue)
                .await;

            shared.finish(&launch.name, result);
        });
    }

    fn finish(&self, name: &str, result: Result<()>) {
        let outcome = match result {
            Ok(()) => {
                info!(command = %name, "command finished");
                CompletionOutcome::Succeeded
            }
            Err(err) => {
                error!(command = %name, error = %err, "command failed");
                CompletionOutcome::Failed
            }
        };

        {
            let _scan = self.scan_lock.lock();
            let write = self.queue.lock().complete(name, outcome);
            if let Some(write) = write {
                self.persist(&write);
            }
        }

        self.signal(Trigger::Completed(name.to_string()));
    }
}

async fn work_loop(shared: Arc<Shared>, mut trigger_rx: mpsc::UnboundedReceiver<Trigger>) {
    info!("scheduler work loop started");
    let mut reported_stalls: HashSet<CommandName> = HashSet::new();

    while let Some(trigger) = trigger_rx.recv().await {
        if trigger == Trigger::Shutdown {
            info!("scheduler work loop stopping");
            break;
        }

        debug!(?trigger, "scheduler woke up");
        shared.scan();

        let (pending, stalled) = {
            let queue = shared.queue.lock();
            (queue.pending(), queue.stalled())
        };
        shared.watchers.broadcast(&pending);

        for name in stalled.iter().filter(|n| !reported_stalls.contains(*n)) {
            warn!(
                command = %name,
                "command is waiting on a failed dependency; re-enqueue the dependency to continue"
            );
        }
        reported_stalls = stalled.into_iter().collect();
    }

    shared.watchers.close_all();
    info!("scheduler work loop finished");
}
