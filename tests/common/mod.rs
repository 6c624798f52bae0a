#![allow(dead_code)]

use std::sync::Arc;

use scrolld::engine::Scheduler;
use scrolld::exec::{PluginDispatch, ProcedureExecutor};
use scrolld::manifest::Manifest;
use scrolld::status::{MemoryStatusStore, StatusRecord};
use scrolld_test_utils::fake_runner::FakeProcessRunner;

pub use scrolld_test_utils::builders;
pub use scrolld_test_utils::{eventually, init_tracing, with_timeout};

/// Scheduler over a fake runner and an in-memory store.
pub fn start_with_fake(manifest: Manifest, runner: Arc<FakeProcessRunner>) -> Scheduler {
    let store = MemoryStatusStore::new(manifest.fingerprint());
    Scheduler::start(
        Arc::new(manifest),
        ProcedureExecutor::without_plugins(runner),
        Box::new(store),
    )
}

/// Same, but seeded from a record left by an earlier daemon.
pub fn restart_with_fake(
    manifest: Manifest,
    runner: Arc<FakeProcessRunner>,
    record: StatusRecord,
) -> Scheduler {
    Scheduler::start(
        Arc::new(manifest),
        ProcedureExecutor::without_plugins(runner),
        Box::new(MemoryStatusStore::with_record(record)),
    )
}

pub fn start_with_plugins(
    manifest: Manifest,
    runner: Arc<FakeProcessRunner>,
    plugins: Arc<dyn PluginDispatch>,
) -> Scheduler {
    let store = MemoryStatusStore::new(manifest.fingerprint());
    Scheduler::start(
        Arc::new(manifest),
        ProcedureExecutor::new(runner, plugins),
        Box::new(store),
    )
}
