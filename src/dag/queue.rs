// src/dag/queue.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::closure::ClosureView;
use crate::dag::queue_step::{Launch, ScanStep, StatusWrite};
use crate::engine::{CommandName, CompletionOutcome};
use crate::errors::{Result, ScrollError};
use crate::manifest::{CommandLookup, CommandSpec};
use crate::status::StatusRecord;
use crate::types::{CommandStatus, RunPolicy};

/// Runtime entry for a command the queue has touched.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub status: CommandStatus,
    /// Mirror status transitions into the status store.
    pub persist: bool,
    /// How many times the command has been launched by this process.
    pub launches: u64,
    pub spec: Arc<CommandSpec>,
}

impl QueueEntry {
    fn new(spec: Arc<CommandSpec>, status: CommandStatus, persist: bool) -> Self {
        Self {
            status,
            persist,
            launches: 0,
            spec,
        }
    }

    /// Whether a scan should leave this entry alone.
    ///
    /// `Restart` commands are never settled: they relaunch after success or
    /// failure.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal() && self.spec.run != RunPolicy::Restart
    }
}

/// Pure command queue: the scheduling semantics without locks, channels or
/// IO.
///
/// Every operation returns the status writes the caller should persist, so
/// the async shell (`engine::Scheduler`) owns all side effects. Entries are
/// only removed by [`CommandQueue::evict_terminal`].
pub struct CommandQueue {
    lookup: Arc<dyn CommandLookup>,
    entries: BTreeMap<CommandName, QueueEntry>,
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl CommandQueue {
    pub fn new(lookup: Arc<dyn CommandLookup>) -> Self {
        Self {
            lookup,
            entries: BTreeMap::new(),
        }
    }

    /// Add `name` to the queue as `Waiting`.
    ///
    /// - `Once` commands are always persisted.
    /// - A `Waiting`/`Running` entry fails with `AlreadyQueued`.
    /// - A `Done` `Once` entry fails with `AlreadyCompletedOnce`.
    ///
    /// Returns the write to persist, if the entry is persisted.
    pub fn enqueue(&mut self, name: &str, persist: bool) -> Result<Option<StatusWrite>> {
        let spec = self.lookup.lookup(name)?;
        let persist = persist || spec.run == RunPolicy::Once;

        if let Some(entry) = self.entries.get_mut(name) {
            match entry.status {
                CommandStatus::Waiting | CommandStatus::Running => {
                    return Err(ScrollError::AlreadyQueued(name.to_string()));
                }
                CommandStatus::Done if spec.run == RunPolicy::Once => {
                    return Err(ScrollError::AlreadyCompletedOnce(name.to_string()));
                }
                CommandStatus::Done | CommandStatus::Error => {
                    entry.status = CommandStatus::Waiting;
                    entry.persist = persist;
                }
            }
        } else {
            self.entries.insert(
                name.to_string(),
                QueueEntry::new(spec, CommandStatus::Waiting, persist),
            );
        }

        debug!(command = %name, persist, "command queued as waiting");
        Ok(persist.then(|| StatusWrite::new(name, CommandStatus::Waiting)))
    }

    /// One scan pass over every entry.
    ///
    /// Unknown dependencies are enqueued (inheriting `persist`) and checked on
    /// the next pass; entries whose dependencies are all `Done` move to
    /// `Running` and are returned as launches.
    pub fn scan(&mut self) -> ScanStep {
        let mut step = ScanStep::default();
        let names: Vec<CommandName> = self.entries.keys().cloned().collect();

        for name in names {
            let Some(entry) = self.entries.get(&name) else {
                continue;
            };
            if entry.status == CommandStatus::Running || entry.is_settled() {
                continue;
            }

            let persist = entry.persist;
            let spec = Arc::clone(&entry.spec);
            let mut ready = true;

            for dep in spec.needs.iter() {
                match self.entries.get(dep) {
                    None => {
                        ready = false;
                        match self.enqueue(dep, persist) {
                            Ok(write) => {
                                debug!(command = %name, dependency = %dep, "enqueued missing dependency");
                                step.discovered.push(dep.clone());
                                step.writes.extend(write);
                            }
                            Err(err) => {
                                warn!(command = %name, dependency = %dep, error = %err, "could not enqueue dependency");
                            }
                        }
                    }
                    Some(dep_entry) if dep_entry.status != CommandStatus::Done => {
                        ready = false;
                    }
                    Some(_) => {}
                }
            }

            if !ready {
                continue;
            }

            if let Some(entry) = self.entries.get_mut(&name) {
                entry.status = CommandStatus::Running;
                entry.launches += 1;
                info!(
                    command = %name,
                    launch = entry.launches,
                    "dependencies satisfied; marking Running"
                );
                if entry.persist {
                    step.writes.push(StatusWrite::new(name.clone(), CommandStatus::Running));
                }
                step.launches.push(Launch { name, spec });
            }
        }

        step
    }

    /// Record the end of a launch.
    ///
    /// - failure: `Error`, persisted if the entry is persisted;
    /// - success of a persisted non-restart command: `Done`, persisted;
    /// - success of a `Restart` command: back to `Waiting`, never persisted;
    /// - any other success: `Done`, not persisted.
    pub fn complete(&mut self, name: &str, outcome: CompletionOutcome) -> Option<StatusWrite> {
        let Some(entry) = self.entries.get_mut(name) else {
            warn!(command = %name, "completion for command that is not queued; ignoring");
            return None;
        };

        let run = entry.spec.run;
        match outcome {
            CompletionOutcome::Failed => {
                entry.status = CommandStatus::Error;
                entry
                    .persist
                    .then(|| StatusWrite::new(name, CommandStatus::Error))
            }
            CompletionOutcome::Succeeded if entry.persist && run != RunPolicy::Restart => {
                entry.status = CommandStatus::Done;
                Some(StatusWrite::new(name, CommandStatus::Done))
            }
            CompletionOutcome::Succeeded if run == RunPolicy::Restart => {
                entry.status = CommandStatus::Waiting;
                None
            }
            CompletionOutcome::Succeeded => {
                entry.status = CommandStatus::Done;
                None
            }
        }
    }

    /// Seed the queue from a persisted record.
    ///
    /// `waiting` and `running` mean a run was interrupted; those commands are
    /// queued again as `Waiting`. A `done` record is kept only for `Once`
    /// commands. Other terminal records describe an earlier daemon's runs and
    /// are left out, so a scan enqueues those commands fresh when needed.
    /// Returns the resumed command names.
    pub fn restore(&mut self, record: &StatusRecord) -> Vec<CommandName> {
        let mut resumed = Vec::new();

        for (name, status) in record.statuses.iter() {
            let spec = match self.lookup.lookup(name) {
                Ok(spec) => spec,
                Err(_) => {
                    warn!(command = %name, "status file names a command missing from the manifest; ignoring");
                    continue;
                }
            };

            let restored = match status {
                CommandStatus::Done if spec.run == RunPolicy::Once => CommandStatus::Done,
                CommandStatus::Done | CommandStatus::Error => {
                    debug!(command = %name, persisted = %status, run = ?spec.run, "stale terminal status; not restored");
                    continue;
                }
                CommandStatus::Waiting | CommandStatus::Running => {
                    resumed.push(name.clone());
                    CommandStatus::Waiting
                }
            };

            debug!(command = %name, persisted = %status, restored = %restored, "restored command status");
            self.entries
                .insert(name.clone(), QueueEntry::new(spec, restored, true));
        }

        resumed
    }

    /// Names of entries that are not terminal (`Waiting` or `Running`).
    pub fn pending(&self) -> Vec<CommandName> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.status.is_terminal())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<CommandName, CommandStatus> {
        self.entries
            .iter()
            .map(|(name, e)| (name.clone(), e.status))
            .collect()
    }

    pub fn status_of(&self, name: &str) -> Option<CommandStatus> {
        self.entries.get(name).map(|e| e.status)
    }

    pub fn entry(&self, name: &str) -> Option<&QueueEntry> {
        self.entries.get(name)
    }

    pub fn launch_count(&self, name: &str) -> u64 {
        self.entries.get(name).map_or(0, |e| e.launches)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Waiting` commands blocked forever by a failed non-restart dependency.
    pub fn stalled(&self) -> Vec<CommandName> {
        let view = ClosureView::new(&self.entries);
        self.entries
            .iter()
            .filter(|(_, e)| e.status == CommandStatus::Waiting)
            .filter(|(name, _)| view.blocked_by_failure(name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether `name` or anything in its transitive `needs` is still pending.
    pub fn closure_pending(&self, name: &str) -> bool {
        ClosureView::new(&self.entries).any_pending(name)
    }

    /// Remove entries that are terminal, not `Restart` or `Once`, and not
    /// needed by any other tracked entry. Returns the evicted names.
    pub fn evict_terminal(&mut self) -> Vec<CommandName> {
        let evictable: Vec<CommandName> = self
            .entries
            .iter()
            .filter(|(_, e)| e.status.is_terminal())
            .filter(|(_, e)| !matches!(e.spec.run, RunPolicy::Restart | RunPolicy::Once))
            .filter(|(name, _)| {
                !self
                    .entries
                    .values()
                    .any(|other| other.spec.needs.iter().any(|dep| dep == *name))
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in &evictable {
            self.entries.remove(name);
            debug!(command = %name, "evicted terminal command from queue");
        }

        evictable
    }
}
