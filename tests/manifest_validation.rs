// tests/manifest_validation.rs

use std::io::Write;

use tempfile::NamedTempFile;

use scrolld::errors::ScrollError;
use scrolld::manifest::{
    load_and_validate, Manifest, ProcedureData, ProcedureMode, WaitSpec,
};
use scrolld::types::RunPolicy;

fn load(toml: &str) -> Result<Manifest, ScrollError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    load_and_validate(file.path())
}

fn expect_manifest_error(toml: &str, needle: &str) {
    match load(toml) {
        Err(ScrollError::ManifestError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should contain {needle:?}");
        }
        other => panic!("Expected ManifestError containing {needle:?}, got {other:?}"),
    }
}

#[test]
fn test_cycle_returns_structured_error() {
    let result = load(
        r#"
name = "cyclic"

[commands.A]
needs = ["B"]

[commands.B]
needs = ["A"]
"#,
    );

    match result {
        Err(ScrollError::DependencyCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        other => panic!("Expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn test_unknown_dependency_is_rejected() {
    expect_manifest_error(
        r#"
name = "s"

[commands.start]
needs = ["install"]
"#,
        "unknown dependency 'install'",
    );
}

#[test]
fn test_self_dependency_is_rejected() {
    expect_manifest_error(
        r#"
name = "s"

[commands.start]
needs = ["start"]
"#,
        "cannot depend on itself",
    );
}

#[test]
fn test_unknown_init_is_rejected() {
    expect_manifest_error(
        r#"
name = "s"
init = "boot"

[commands.start]
"#,
        "`init` refers to unknown command 'boot'",
    );
}

#[test]
fn test_manifest_without_commands_is_rejected() {
    expect_manifest_error(r#"name = "empty""#, "at least one");
}

#[test]
fn test_empty_name_is_rejected() {
    expect_manifest_error(
        r#"
name = "  "

[commands.start]
"#,
        "`name` must not be empty",
    );
}

#[test]
fn test_bad_wait_values_are_rejected() {
    for wait in [r#""soon""#, "-3", "1.5"] {
        expect_manifest_error(
            &format!(
                r#"
name = "s"

[[commands.start.procedures]]
mode = "exec"
data = "true"
wait = {wait}
"#
            ),
            "`wait` must be a bool or a non-negative number of seconds",
        );
    }
}

#[test]
fn test_exec_without_data_is_rejected() {
    expect_manifest_error(
        r#"
name = "s"

[[commands.start.procedures]]
mode = "exec"
"#,
        "non-empty argv",
    );

    expect_manifest_error(
        r#"
name = "s"

[[commands.start.procedures]]
mode = "exec"
data = []
"#,
        "non-empty argv",
    );
}

#[test]
fn test_stdin_needs_target_and_input() {
    expect_manifest_error(
        r#"
name = "s"

[[commands.say.procedures]]
mode = "stdin"
data = ["server"]
"#,
        "[process_id, input] pair",
    );
}

#[test]
fn test_delegation_to_unknown_command_is_rejected() {
    expect_manifest_error(
        r#"
name = "s"

[[commands.start.procedures]]
mode = "command"
data = "missing"
"#,
        "delegates to unknown command 'missing'",
    );
}

#[test]
fn test_duplicate_procedure_ids_are_rejected() {
    expect_manifest_error(
        r#"
name = "s"

[[commands.a.procedures]]
id = "server"
mode = "exec"
data = "true"

[[commands.b.procedures]]
id = "server"
mode = "exec"
data = "true"
"#,
        "procedure id 'server' is used more than once",
    );
}

#[test]
fn test_invalid_run_policy_is_a_toml_error() {
    let result = load(
        r#"
name = "s"

[commands.start]
run = "sometimes"
"#,
    );
    assert!(matches!(result, Err(ScrollError::TomlError(_))), "got {result:?}");
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("scroll.toml"));
    assert!(matches!(result, Err(ScrollError::IoError(_))), "got {result:?}");
}

#[test]
fn test_full_manifest_resolves_procedures() {
    let manifest = load(
        r#"
name = "minecraft"
version = "1.2.0"
init = "start"

[commands.install]
run = "once"

[[commands.install.procedures]]
mode = "exec"
data = ["touch", "install.txt"]

[commands.start]
run = "restart"
needs = ["install"]

[[commands.start.procedures]]
id = "server"
mode = "exec-tty"
data = "java -jar server.jar"

[[commands.start.procedures]]
mode = "stdin"
data = ["server", "say hello"]
wait = 5

[[commands.start.procedures]]
mode = "plugin:rcon"
data = { cmd = "list" }
wait = false
ignore_failure = true

[commands.stop]

[[commands.stop.procedures]]
mode = "sub-command"
data = "install"

[[commands.stop.procedures]]
mode = "teleport"
"#,
    )
    .unwrap();

    assert_eq!(manifest.name, "minecraft");
    assert_eq!(manifest.version.as_deref(), Some("1.2.0"));
    assert_eq!(manifest.init.as_deref(), Some("start"));
    assert_eq!(
        manifest.command_names().collect::<Vec<_>>(),
        vec!["install", "start", "stop"]
    );

    let install = manifest.get("install").unwrap();
    assert_eq!(install.run, RunPolicy::Once);
    assert_eq!(install.procedures[0].id, "install.0");
    assert_eq!(
        install.procedures[0].data,
        ProcedureData::Argv(vec!["touch".into(), "install.txt".into()])
    );

    let start = manifest.get("start").unwrap();
    assert_eq!(start.run, RunPolicy::Restart);
    assert_eq!(start.needs, vec!["install".to_string()]);

    let server = &start.procedures[0];
    assert_eq!(server.id, "server");
    assert_eq!(server.mode, ProcedureMode::ExecTty);
    assert_eq!(
        server.data,
        ProcedureData::Argv(vec!["sh".into(), "-c".into(), "java -jar server.jar".into()])
    );
    assert_eq!(server.wait, WaitSpec::None);

    let say = &start.procedures[1];
    assert_eq!(say.id, "start.1");
    assert_eq!(say.wait, WaitSpec::Delayed(5));
    assert_eq!(
        say.data,
        ProcedureData::Stdin {
            target: "server".into(),
            input: "say hello".into()
        }
    );

    let rcon = &start.procedures[2];
    assert_eq!(rcon.mode, ProcedureMode::Plugin("rcon".into()));
    assert_eq!(rcon.wait, WaitSpec::Immediate(false));
    assert!(rcon.ignore_failure);
    match &rcon.data {
        ProcedureData::Payload(payload) => assert!(payload.contains("list")),
        other => panic!("Expected plugin payload, got {other:?}"),
    }

    let stop = manifest.get("stop").unwrap();
    assert_eq!(stop.run, RunPolicy::Always);
    assert_eq!(stop.procedures[0].mode, ProcedureMode::Command);
    assert_eq!(stop.procedures[0].data, ProcedureData::Command("install".into()));
    assert_eq!(
        stop.procedures[1].mode,
        ProcedureMode::Unsupported("teleport".into())
    );

    let fp = manifest.fingerprint();
    assert_eq!(fp.name, "minecraft");
    assert_eq!(fp.version.as_deref(), Some("1.2.0"));
}

#[test]
fn test_unknown_command_lookup_fails() {
    use scrolld::manifest::CommandLookup;

    let manifest = load(
        r#"
name = "s"

[commands.start]
"#,
    )
    .unwrap();

    assert!(manifest.lookup("start").is_ok());
    assert!(matches!(
        manifest.lookup("nope"),
        Err(ScrollError::CommandNotFound(name)) if name == "nope"
    ));
}

#[test]
fn test_demo_manifest_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/scroll.toml");
    let manifest = load_and_validate(&path).unwrap();

    assert_eq!(manifest.init.as_deref(), Some("start"));
    assert_eq!(manifest.get("start").unwrap().run, RunPolicy::Restart);
    assert_eq!(manifest.get("start").unwrap().procedures[0].id, "server");
    assert_eq!(
        manifest.get("update").unwrap().procedures[0].data,
        ProcedureData::Command("backup".into())
    );
}

#[test]
fn test_run_policy_from_str() {
    assert_eq!(" Once ".parse::<RunPolicy>(), Ok(RunPolicy::Once));
    assert_eq!("restart".parse::<RunPolicy>(), Ok(RunPolicy::Restart));
    assert!("sometimes".parse::<RunPolicy>().is_err());
}
