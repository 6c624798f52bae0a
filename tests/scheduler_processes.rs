// tests/scheduler_processes.rs
//
// Scheduler and process runner against real `sh` processes.

mod common;
use crate::common::builders::{CommandBuilder, ManifestBuilder, ProcedureBuilder};
use crate::common::{eventually, init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use scrolld::engine::Scheduler;
use scrolld::errors::ScrollError;
use scrolld::exec::{ProcedureExecutor, ProcessRequest, ProcessRunner, TokioProcessRunner};
use scrolld::manifest::Manifest;
use scrolld::status::{read_record, FileStatusStore, STATUS_FILE_NAME};
use scrolld::types::CommandStatus;

type TestResult = Result<(), Box<dyn Error>>;

fn start_in(dir: &Path, manifest: Manifest) -> Result<(Scheduler, Arc<TokioProcessRunner>), ScrollError> {
    let runner = Arc::new(TokioProcessRunner::new().with_working_dir(dir));
    let store = FileStatusStore::open(dir.join(STATUS_FILE_NAME), manifest.fingerprint(), false)?;
    let scheduler = Scheduler::start(
        Arc::new(manifest),
        ProcedureExecutor::without_plugins(runner.clone()),
        Box::new(store),
    );
    Ok((scheduler, runner))
}

fn request(name: &str, line: &str) -> ProcessRequest {
    ProcessRequest {
        name: name.to_string(),
        argv: vec!["sh".into(), "-c".into(), line.into()],
        tty: false,
    }
}

#[tokio::test]
async fn test_once_install_runs_once_under_restart_loop() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let manifest = ManifestBuilder::new("minecraft")
        .version("1")
        .with_command(
            "install",
            CommandBuilder::new().once().shell("echo installed >> install.txt").build(),
        )
        .with_command(
            "start",
            CommandBuilder::new().restart().needs("install").shell("sleep 0.1").build(),
        )
        .build();
    let (scheduler, runner) = start_in(dir.path(), manifest)?;

    scheduler.enqueue("start", true)?;
    eventually("start relaunched five times", || scheduler.launch_count("start") >= 5).await;

    scheduler.shutdown();
    scheduler.join().await;
    runner.stop_all();

    let installed = fs::read_to_string(dir.path().join("install.txt"))?;
    assert_eq!(installed.lines().count(), 1);

    let record = read_record(&dir.path().join(STATUS_FILE_NAME))?;
    assert_eq!(record.status_of("install"), Some(CommandStatus::Done));
    assert_ne!(record.status_of("start"), Some(CommandStatus::Done));
    assert_eq!(record.scroll_name, "minecraft");
    assert_eq!(record.scroll_version.as_deref(), Some("1"));
    Ok(())
}

#[tokio::test]
async fn test_delayed_procedure_fires_after_command_is_done() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let manifest = ManifestBuilder::new("delayed")
        .with_command(
            "later",
            CommandBuilder::new()
                .procedure(ProcedureBuilder::shell("touch delayed.txt").wait_secs(1))
                .build(),
        )
        .build();
    let (scheduler, _runner) = start_in(dir.path(), manifest)?;
    let marker = dir.path().join("delayed.txt");

    scheduler.enqueue("later", true)?;
    with_timeout(scheduler.drain_all()).await;

    assert_eq!(scheduler.status_of("later"), Some(CommandStatus::Done));
    assert!(!marker.exists(), "delayed procedure ran too early");

    eventually("delayed procedure ran", || marker.exists()).await;
    Ok(())
}

#[tokio::test]
async fn test_stdin_procedure_feeds_running_process() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let manifest = ManifestBuilder::new("stdin")
        .with_command(
            "start",
            CommandBuilder::new()
                .procedure(
                    ProcedureBuilder::shell(r#"read line; echo "$line" > got.txt"#).id("server"),
                )
                .build(),
        )
        .with_command(
            "say",
            CommandBuilder::new()
                .procedure(ProcedureBuilder::stdin("server", "hello world"))
                .build(),
        )
        .build();
    let (scheduler, runner) = start_in(dir.path(), manifest)?;

    scheduler.enqueue("start", false)?;
    eventually("server running", || runner.running() == vec!["server".to_string()]).await;

    scheduler.enqueue("say", false)?;
    with_timeout(scheduler.drain_all()).await;

    assert_eq!(scheduler.status_of("say"), Some(CommandStatus::Done));
    assert_eq!(scheduler.status_of("start"), Some(CommandStatus::Done));
    assert_eq!(fs::read_to_string(dir.path().join("got.txt"))?.trim(), "hello world");
    assert!(runner.running().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runner_reports_exit_codes() -> TestResult {
    init_tracing();
    let runner = TokioProcessRunner::new();

    assert_eq!(runner.run(request("ok", "exit 0")).await?, 0);
    assert_eq!(runner.run(request("bad", "exit 3")).await?, 3);
    assert!(runner.running().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runner_spawn_failure_is_an_error() {
    init_tracing();
    let runner = TokioProcessRunner::new();

    let result = runner
        .run(ProcessRequest {
            name: "ghost".into(),
            argv: vec!["/definitely/not/a/binary".into()],
            tty: false,
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_runner_stdin_to_unknown_process() {
    init_tracing();
    let runner = TokioProcessRunner::new();

    match runner.write_stdin("server", "stop").await {
        Err(ScrollError::ProcessNotFound(name)) => assert_eq!(name, "server"),
        other => panic!("Expected ProcessNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_runner_stop_terminates_process() -> TestResult {
    init_tracing();
    let runner = TokioProcessRunner::new();

    let task = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(request("sleeper", "sleep 30")).await })
    };

    eventually("sleeper running", || runner.running() == vec!["sleeper".to_string()]).await;
    assert!(runner.stop("sleeper"));
    assert!(!runner.stop("nobody"));

    match with_timeout(task).await? {
        Err(ScrollError::Terminated(name)) => assert_eq!(name, "sleeper"),
        other => panic!("Expected Terminated, got {other:?}"),
    }
    eventually("table cleared", || runner.running().is_empty()).await;
    Ok(())
}

#[tokio::test]
async fn test_runner_restarting_a_name_stops_previous_instance() -> TestResult {
    init_tracing();
    let runner = TokioProcessRunner::new();

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(request("server", "sleep 30")).await })
    };
    eventually("first server running", || !runner.running().is_empty()).await;

    let second = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(request("server", "sleep 0.2")).await })
    };

    assert!(matches!(
        with_timeout(first).await?,
        Err(ScrollError::Terminated(_))
    ));
    assert_eq!(with_timeout(second).await??, 0);
    Ok(())
}

#[tokio::test]
async fn test_status_file_version_drift_blocks_start() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let v1 = ManifestBuilder::new("mc")
        .version("1")
        .with_command("install", CommandBuilder::new().once().shell("true").build())
        .build();
    let (scheduler, _runner) = start_in(dir.path(), v1)?;
    scheduler.enqueue("install", true)?;
    with_timeout(scheduler.drain_all()).await;
    scheduler.shutdown();
    scheduler.join().await;

    let v2 = ManifestBuilder::new("mc")
        .version("2")
        .with_command("install", CommandBuilder::new().once().shell("true").build())
        .build();
    assert!(matches!(
        start_in(dir.path(), v2),
        Err(ScrollError::ManifestMismatch { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_runner_honours_working_dir() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let runner = TokioProcessRunner::new().with_working_dir(dir.path());

    assert_eq!(runner.run(request("touch", "touch here.txt")).await?, 0);
    assert!(dir.path().join("here.txt").exists());
    Ok(())
}
