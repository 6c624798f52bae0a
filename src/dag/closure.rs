// src/dag/closure.rs

//! Read-only traversal of the transitive `needs` closure of queued commands.

use std::collections::{BTreeMap, HashSet};

use crate::dag::queue::QueueEntry;
use crate::engine::CommandName;
use crate::types::{CommandStatus, RunPolicy};

/// Read-only view over queue entries for closure queries.
pub struct ClosureView<'a> {
    entries: &'a BTreeMap<CommandName, QueueEntry>,
}

impl<'a> ClosureView<'a> {
    pub fn new(entries: &'a BTreeMap<CommandName, QueueEntry>) -> Self {
        Self { entries }
    }

    /// Tracked entries reachable from `root` through `needs`, `root`
    /// included. Dependencies not yet queued are skipped.
    pub fn closure(&self, root: &str) -> Vec<&'a str> {
        let mut stack: Vec<&'a str> = Vec::new();
        let mut visited: HashSet<&'a str> = HashSet::new();
        let mut out = Vec::new();

        if let Some((name, _)) = self.entries.get_key_value(root) {
            stack.push(name.as_str());
        }

        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            let Some(entry) = self.entries.get(name) else {
                continue;
            };
            out.push(name);

            for dep in entry.spec.needs.iter() {
                if let Some((dep_name, _)) = self.entries.get_key_value(dep) {
                    stack.push(dep_name.as_str());
                }
            }
        }

        out
    }

    /// Whether anything in the closure of `root` is `Waiting` or `Running`.
    pub fn any_pending(&self, root: &str) -> bool {
        self.closure(root).into_iter().any(|name| {
            self.entries
                .get(name)
                .is_some_and(|e| !e.status.is_terminal())
        })
    }

    /// Whether a strict dependency of `root` sits in `Error` under a policy
    /// that will never relaunch it.
    pub fn blocked_by_failure(&self, root: &str) -> bool {
        self.closure(root)
            .into_iter()
            .filter(|name| *name != root)
            .any(|name| {
                self.entries.get(name).is_some_and(|e| {
                    e.status == CommandStatus::Error && e.spec.run != RunPolicy::Restart
                })
            })
    }
}
