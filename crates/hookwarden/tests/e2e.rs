// End-to-end tests for the hkw binary.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

struct Project {
    dir: TempDir,
    config_home: TempDir,
}

impl Project {
    fn new(hooks_toml: &str) -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".hookwarden/hooks")).unwrap();
        fs::write(dir.path().join(".hookwarden/hooks.toml"), hooks_toml).unwrap();
        Self {
            dir,
            config_home: tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hkw"));
        cmd.arg("--project-root")
            .arg(self.root())
            .args(args)
            // Keep the user's global settings and hooks out of the way.
            .env("XDG_CONFIG_HOME", self.config_home.path())
            .env("HOME", self.config_home.path())
            .env_remove("HKW_LOG_DIR")
            .env_remove("HKW_HOOKS_ROOT")
            .env_remove("HKW_HOOKS_FILE")
            .env_remove("RUST_LOG");
        cmd
    }

    fn hkw(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("failed to run hkw")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const HOOKS: &str = r#"
version = 1

[[hooks]]
name = "quality-check-strict"
events = [{ type = "implement.completed" }]
command = "echo 'lint failed' >&2; exit 1"
fail_mode = "stop"

[[hooks]]
name = "optional-notification"
events = [{ type = "implement.completed" }]
command = "touch notified"

[[hooks]]
name = "catch-all-tasks"
events = [{ type = "task.*" }]
command = "echo {task_id}"
"#;

#[test]
fn cli_help_displays_correctly() {
    let output = Command::new(env!("CARGO_BIN_EXE_hkw"))
        .arg("--help")
        .output()
        .expect("failed to run hkw --help");

    assert!(output.status.success());
    let text = stdout(&output);
    for sub in ["emit", "validate", "audit", "attest"] {
        assert!(text.contains(sub), "missing {sub} in help");
    }
}

#[cfg(unix)]
#[test]
fn emit_success_then_query() {
    let project = Project::new(HOOKS);
    let output = project.hkw(&["emit", "task.created", "--task-id", "task-42"]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(stdout(&output).contains("catch-all-tasks"));

    let output = project.hkw(&["--format", "json", "audit", "query", "--correlation-id", "task-42"]);
    assert!(output.status.success());
    let records: Vec<Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["hook_name"], "catch-all-tasks");
    assert_eq!(records[0]["stdout_excerpt"], "task-42\n");
}

#[cfg(unix)]
#[test]
fn stop_hook_failure_exits_one() {
    let project = Project::new(HOOKS);
    let output = project.hkw(&["--format", "json", "emit", "implement.completed"]);
    assert_eq!(output.status.code(), Some(1));

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["aborted_by"], "quality-check-strict");
    assert_eq!(summary["skipped"][0], "optional-notification");
    assert!(!project.root().join("notified").exists());

    let stats = project.hkw(&["--format", "json", "audit", "stats"]);
    let stats: Value = serde_json::from_slice(&stats.stdout).unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["failed"], 1);
}

#[test]
fn dry_run_records_nothing() {
    let project = Project::new(HOOKS);
    let output = project.hkw(&["emit", "implement.completed", "--dry-run"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("would run"));
    assert!(!project.root().join(".hookwarden/logs/hooks.jsonl").exists());
}

#[test]
fn validate_reports_every_problem() {
    let project = Project::new(
        r#"
[[hooks]]
name = "bad-pattern"
events = [{ type = "*" }]
command = "true"

[[hooks]]
name = "escape"
events = [{ type = "task.created" }]
script = "../../etc/passwd"
"#,
    );
    let output = project.hkw(&["--format", "json", "validate"]);
    assert_eq!(output.status.code(), Some(1));
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["valid"], false);
    let hooks: Vec<&str> = doc["problems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["hook"].as_str().unwrap())
        .collect();
    assert_eq!(hooks, vec!["bad-pattern", "escape"]);
}

#[test]
fn validate_accepts_good_config() {
    let project = Project::new(HOOKS);
    let output = project.hkw(&["validate"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("3 hook(s) OK"));
}

#[test]
fn emit_with_invalid_config_exits_one() {
    let project = Project::new("[[hooks]]\nname = \"x\"\nevents = []\ncommand = \"true\"\n");
    let output = project.hkw(&["emit", "task.created"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("declares no events"));
}

#[test]
fn attest_exports_statement() {
    let project = Project::new(HOOKS);
    fs::write(project.root().join("artifact.txt"), "abc").unwrap();

    let output = project.hkw(&[
        "attest",
        "implement task-42",
        "--subject",
        "task-42=abc",
        "--file",
        "artifact=artifact.txt",
    ]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let path = project
        .root()
        .join(".hookwarden/attestations/implement-task-42.intoto.json");
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(doc["_type"], "https://in-toto.io/Statement/v1");
    assert_eq!(doc["subject"][0]["name"], "task-42");
    assert_eq!(doc["subject"][0]["digest"]["sha256"], "abc");
    assert_eq!(
        doc["subject"][1]["digest"]["sha256"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn attest_without_subjects_fails() {
    let project = Project::new(HOOKS);
    let output = project.hkw(&["attest", "release"]);
    assert_eq!(output.status.code(), Some(1));
}

#[cfg(unix)]
#[test]
fn audit_clear_empties_trail() {
    let project = Project::new(HOOKS);
    project.hkw(&["emit", "task.created"]);
    assert!(project.root().join(".hookwarden/logs/hooks.jsonl").exists());

    let output = project.hkw(&["audit", "clear"]);
    assert!(output.status.success());
    let output = project.hkw(&["audit", "report"]);
    assert!(stdout(&output).contains("No hook executions recorded."));
}

#[test]
fn diagnostics_include_project_loading() {
    let project = Project::new(HOOKS);
    let output = project
        .command(&["validate"])
        .env("RUST_LOG", "debug")
        .output()
        .expect("failed to run hkw");
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project loaded"));
}
