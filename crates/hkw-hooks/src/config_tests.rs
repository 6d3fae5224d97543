use super::*;
use tempfile::{TempDir, tempdir};

struct Fixture {
    dir: TempDir,
    validator: PathValidator,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().join("hooks");
        fs::create_dir_all(root.join("checks")).unwrap();
        fs::write(root.join("checks/quality.sh"), "#!/bin/sh\nexit 1\n").unwrap();
        let validator = PathValidator::new(root);
        Self { dir, validator }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

fn has(report: &ValidationReport, pred: impl Fn(&ConfigError) -> bool) -> bool {
    report.errors.iter().any(pred)
}

const VALID_TOML: &str = r#"
version = 1

[[hooks]]
name = "quality-check-strict"
events = [{ type = "implement.completed" }]
script = "checks/quality.sh"
fail_mode = "stop"

[[hooks]]
name = "catch-all-tasks"
events = [{ type = "task.*" }]
command = "echo {event_type}"
timeout = 5
env = { LEVEL = "debug" }
"#;

#[test]
fn test_load_valid_toml() {
    let fx = Fixture::new();
    let path = fx.write("hooks.toml", VALID_TOML);
    let set = HookSet::load(&path, &fx.validator).unwrap();

    assert_eq!(set.len(), 2);
    let strict = set.get("quality-check-strict").unwrap();
    assert_eq!(strict.fail_mode, FailMode::Stop);
    assert_eq!(strict.timeout, Duration::from_secs(30));
    assert_eq!(
        strict.action,
        HookAction::Script(PathBuf::from("checks/quality.sh"))
    );

    let catch_all = set.get("catch-all-tasks").unwrap();
    assert_eq!(catch_all.fail_mode, FailMode::Continue);
    assert_eq!(catch_all.timeout, Duration::from_secs(5));
    assert_eq!(catch_all.env.get("LEVEL").map(String::as_str), Some("debug"));
    assert!(catch_all.enabled);
}

#[test]
fn test_load_json_and_yaml() {
    let fx = Fixture::new();
    let json = fx.write(
        "hooks.json",
        r#"{"version": 1, "hooks": [{"name": "j", "events": [{"type": "task.created"}], "command": "true"}]}"#,
    );
    let yaml = fx.write(
        "hooks.yml",
        "version: 1\nhooks:\n  - name: y\n    events:\n      - type: spec.*\n    command: \"true\"\n    enabled: false\n",
    );

    let json_set = HookSet::load(&json, &fx.validator).unwrap();
    assert_eq!(json_set.hooks()[0].name, "j");

    let yaml_set = HookSet::load(&yaml, &fx.validator).unwrap();
    assert!(!yaml_set.hooks()[0].enabled);
    assert!(yaml_set.hooks()[0].matches("spec.created"));
}

#[test]
fn test_format_from_extension() {
    assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")), DocumentFormat::Json);
    assert_eq!(DocumentFormat::from_path(Path::new("a.yaml")), DocumentFormat::Yaml);
    assert_eq!(DocumentFormat::from_path(Path::new("a.toml")), DocumentFormat::Toml);
    assert_eq!(DocumentFormat::from_path(Path::new("hooks")), DocumentFormat::Toml);
}

#[test]
fn test_missing_file_is_empty_set() {
    let fx = Fixture::new();
    let set = HookSet::load(&fx.dir.path().join("absent.toml"), &fx.validator).unwrap();
    assert!(set.is_empty());
}

#[test]
fn test_unknown_field_is_parse_error() {
    let fx = Fixture::new();
    let path = fx.write(
        "hooks.toml",
        r#"
[[hooks]]
name = "x"
events = [{ type = "task.created" }]
command = "true"
retries = 3
"#,
    );
    let report = HookSet::load(&path, &fx.validator).unwrap_err();
    assert_eq!(report.len(), 1);
    match &report.errors[0] {
        ConfigError::Parse { message, .. } => assert!(message.contains("retries")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_validate_reports_every_problem() {
    let fx = Fixture::new();
    let path = fx.write(
        "hooks.toml",
        r#"
version = 2

[[hooks]]
name = "dup"
events = [{ type = "task.created" }]
command = "true"

[[hooks]]
name = "dup"
events = [{ type = "task.created" }]
command = "true"

[[hooks]]
name = "bad-pattern"
events = [{ type = "task.*.done" }, { type = "*" }]
command = "true"

[[hooks]]
name = "both"
events = [{ type = "a.b" }]
command = "true"
script = "checks/quality.sh"

[[hooks]]
name = "neither"
events = [{ type = "a.b" }]

[[hooks]]
name = "escape"
events = [{ type = "a.b" }]
script = "subdir/../../etc/passwd"

[[hooks]]
name = "absolute"
events = [{ type = "a.b" }]
script = "/bin/true"

[[hooks]]
name = "missing"
events = [{ type = "a.b" }]
script = "checks/missing.sh"

[[hooks]]
name = "no-events"
command = "true"
timeout = 0

[[hooks]]
name = "   "
events = [{ type = "a.b" }]
command = "  "
"#,
    );

    let report = HookSet::load(&path, &fx.validator).unwrap_err();

    assert!(has(&report, |e| matches!(e, ConfigError::UnsupportedVersion { found: 2, .. })));
    assert!(has(&report, |e| matches!(e, ConfigError::DuplicateName(n) if n == "dup")));
    assert_eq!(
        report
            .errors
            .iter()
            .filter(|e| matches!(e, ConfigError::InvalidPattern { .. }))
            .count(),
        2
    );
    assert!(has(&report, |e| matches!(e, ConfigError::AmbiguousAction { hook } if hook == "both")));
    assert!(has(&report, |e| matches!(e, ConfigError::AmbiguousAction { hook } if hook == "neither")));
    assert!(has(&report, |e| matches!(
        e,
        ConfigError::Security { hook, source: hkw_core::SecurityError::OutsideRoot { .. } } if hook == "escape"
    )));
    assert!(has(&report, |e| matches!(
        e,
        ConfigError::Security { hook, source: hkw_core::SecurityError::AbsolutePath(_) } if hook == "absolute"
    )));
    assert!(has(&report, |e| matches!(e, ConfigError::ScriptNotFound { path, .. } if path == "checks/missing.sh")));
    assert!(has(&report, |e| matches!(e, ConfigError::NoEvents { hook } if hook == "no-events")));
    assert!(has(&report, |e| matches!(e, ConfigError::ZeroTimeout { hook } if hook == "no-events")));
    assert!(has(&report, |e| matches!(e, ConfigError::EmptyName { index: 9 })));
    assert!(has(&report, |e| matches!(e, ConfigError::EmptyCommand { hook } if hook == "#9")));

    let rendered = report.to_string();
    assert!(rendered.starts_with(&format!("{} configuration problem(s)", report.len())));
}

#[test]
fn test_duplicate_reported_once_per_name() {
    let doc = HooksDocument {
        version: 1,
        hooks: (0..3)
            .map(|_| HookEntry {
                name: "same".to_string(),
                events: vec![EventEntry {
                    event_type: "a.b".to_string(),
                }],
                script: None,
                command: Some("true".to_string()),
                timeout: 30,
                fail_mode: FailMode::Continue,
                env: BTreeMap::new(),
                enabled: true,
            })
            .collect(),
    };
    let fx = Fixture::new();
    let report = doc.validate(&fx.validator).unwrap_err();
    assert_eq!(report.errors, vec![ConfigError::DuplicateName("same".to_string())]);
}

#[test]
fn test_layered_project_overrides_global_by_name() {
    let fx = Fixture::new();
    let global = fx.write(
        "global.toml",
        r#"
[[hooks]]
name = "notify"
events = [{ type = "task.*" }]
command = "echo global"

[[hooks]]
name = "audit-trail"
events = [{ type = "spec.created" }]
command = "echo trail"
"#,
    );
    let project = fx.write(
        "project.toml",
        r#"
[[hooks]]
name = "notify"
events = [{ type = "task.completed" }]
command = "echo project"

[[hooks]]
name = "local-only"
events = [{ type = "task.created" }]
command = "echo local"
"#,
    );

    let set = HookSet::load_layered(Some(&global), &project, &fx.validator).unwrap();
    let names: Vec<_> = set.hooks().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["notify", "audit-trail", "local-only"]);
    assert_eq!(
        set.get("notify").unwrap().action,
        HookAction::Command("echo project".to_string())
    );
}

#[test]
fn test_layered_collects_problems_from_both_documents() {
    let fx = Fixture::new();
    let global = fx.write("global.toml", "[[hooks]]\nname = \"g\"\ncommand = \"true\"\n");
    let project = fx.write("project.toml", "[[hooks]]\nname = \"p\"\nevents = [{ type = \"*\" }]\ncommand = \"true\"\n");

    let report = HookSet::load_layered(Some(&global), &project, &fx.validator).unwrap_err();
    assert_eq!(report.len(), 2);
    assert_eq!(report.errors[0].hook_name(), Some("g"));
    assert_eq!(report.errors[1].hook_name(), Some("p"));
}

#[test]
fn test_hook_set_new_checks_programmatic_definitions() {
    let ok = HookDefinition::new("a", HookAction::Command("true".to_string()))
        .with_event(EventPattern::parse("task.*").unwrap());
    let set = HookSet::new(vec![ok.clone()]).unwrap();
    assert_eq!(set.matching("task.created").len(), 1);

    let zero = ok.clone().with_timeout(Duration::ZERO);
    let report = HookSet::new(vec![ok, zero]).unwrap_err();
    assert!(report.errors.contains(&ConfigError::DuplicateName("a".to_string())));
    assert!(report.errors.contains(&ConfigError::ZeroTimeout {
        hook: "a".to_string()
    }));
}

#[test]
fn test_empty_yaml_document() {
    let doc = HooksDocument::parse("", DocumentFormat::Yaml, "hooks.yaml").unwrap();
    assert!(doc.hooks.is_empty());
    assert_eq!(doc.version, SUPPORTED_VERSION);
}
