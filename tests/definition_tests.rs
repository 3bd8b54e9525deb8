//! Archive definitions read from disk and driven through `run_workflow`.

use std::fs;
use std::path::{Path, PathBuf};

use hivearchive_core::config::ArchiveConfig;
use hivearchive_core::error::Error;
use hivearchive_exec::{
    run_workflow, AlwaysConfirm, DummyBackend, ExecError, ExecutionOptions, Executor, WorkflowResult,
};
use hivearchive_planner::{parse_archive, read_archive, Workflow};

const ARCHIVE: &str = r#"
name: clickstream
templates: hql
config:
  label: nightly
  table_threshold: 2
nodes:
  - { kind: external_table, name: events, database: atomic, partitioned: true }
  - { kind: view_until_table, name: sessions, database: derived, inputs: [events] }
  - { kind: view, name: daily_sessions, database: reports, inputs: [sessions] }
  - { kind: view, name: weekly_sessions, database: reports, inputs: [sessions] }
  - kind: select
    name: top_users
    inputs: [daily_sessions]
"#;

/// A fresh directory holding the definition and its templates.
fn write_archive() -> (PathBuf, PathBuf) {
    let root = std::env::temp_dir().join(format!("hivearchive-{}", uuid::Uuid::new_v4()));
    let hql = root.join("hql");
    fs::create_dir_all(&hql).unwrap();
    let files = [
        ("events.hql", "PARTITIONED BY (dt STRING)\nLOCATION 's3://atomic/events/'"),
        ("sessions.hql", "SELECT user_id, dt FROM {{ inputs.events }} GROUP BY user_id, dt"),
        ("daily_sessions.hql", "SELECT dt, count(*) AS n FROM {{ inputs.sessions }} GROUP BY dt"),
        ("weekly_sessions.hql", "SELECT count(*) AS n FROM {{ inputs['sessions'] }}"),
        ("top_users.hql", "SELECT * FROM {{ inputs.daily_sessions }} ORDER BY n DESC LIMIT 10;"),
    ];
    for (name, text) in files {
        fs::write(hql.join(name), text).unwrap();
    }
    let path = root.join("archive.yaml");
    fs::write(&path, ARCHIVE).unwrap();
    (root, path)
}

fn cleanup(root: &Path) {
    let _ = fs::remove_dir_all(root);
}

#[test]
fn definition_config_overrides_defaults() {
    let parsed = parse_archive(ARCHIVE).unwrap();
    let mut config = ArchiveConfig::default();
    parsed.config.apply(&mut config).unwrap();
    assert_eq!(config.label, "nightly");
    assert_eq!(config.table_threshold, 2);
    assert_eq!(parsed.nodes.len(), 5);
}

#[test]
fn dry_build_renders_templates_from_disk() {
    let (root, path) = write_archive();
    let parsed = read_archive(&path).unwrap();
    assert_eq!(parsed.templates, root.join("hql"));

    let mut registry = parsed.registry(2).unwrap();
    let options = ExecutionOptions::default().dry();
    let mut executor = Executor::new(DummyBackend::new(), AlwaysConfirm, options);
    let result = run_workflow(&mut registry, Workflow::Build, None, &mut executor).unwrap();

    let script = match result {
        WorkflowResult::Dry(script) => script,
        other => panic!("unexpected result: {other:?}"),
    };
    assert!(executor.backend().executed().is_empty());

    let text = script.text();
    // Read by two views, so promoted at threshold 2.
    assert!(text.contains("CREATE TABLE IF NOT EXISTS derived.sessions AS\nSELECT user_id, dt FROM atomic.events"));
    assert!(text.contains("SELECT count(*) AS n FROM derived.sessions\n;"));
    assert!(text.contains("ALTER TABLE atomic.events RECOVER PARTITIONS;"));
    assert_eq!(script.len(), 4);
    cleanup(&root);
}

#[test]
fn run_executes_statement_after_its_inputs() {
    let (root, path) = write_archive();
    let mut registry = read_archive(&path).unwrap().registry(2).unwrap();
    let mut executor = Executor::new(DummyBackend::new(), AlwaysConfirm, ExecutionOptions::default());

    let result = run_workflow(&mut registry, Workflow::Run, Some("top_users"), &mut executor).unwrap();
    let manifest = match result {
        WorkflowResult::Completed { manifest, .. } => manifest,
        other => panic!("unexpected result: {other:?}"),
    };
    assert_eq!(manifest.workflow, "run");
    assert_eq!(manifest.target.as_deref(), Some("top_users"));
    assert_eq!(manifest.statements, 4);

    let executed = executor.backend().executed();
    assert!(executed[0].contains("atomic.events"));
    assert!(executed[3].ends_with("SELECT * FROM reports.daily_sessions ORDER BY n DESC LIMIT 10\n;"));
    cleanup(&root);
}

#[test]
fn missing_template_file_fails_before_execution() {
    let (root, path) = write_archive();
    fs::remove_file(root.join("hql").join("sessions.hql")).unwrap();
    let mut registry = read_archive(&path).unwrap().registry(2).unwrap();
    let mut executor = Executor::new(DummyBackend::new(), AlwaysConfirm, ExecutionOptions::default());

    let err = run_workflow(&mut registry, Workflow::Build, None, &mut executor).unwrap_err();
    assert!(matches!(err, ExecError::Graph(Error::Template { .. })));
    assert!(executor.backend().executed().is_empty());
    cleanup(&root);
}

#[test]
fn invalid_definitions_are_rejected() {
    let missing_file = read_archive(Path::new("/nonexistent/hivearchive/archive.yaml"));
    assert!(matches!(missing_file, Err(Error::Definition(_))));

    let out_of_order = r#"
name: broken
nodes:
  - { kind: view, name: daily, database: reports, inputs: [events] }
  - { kind: external_table, name: events, database: atomic }
"#;
    let err = parse_archive(out_of_order).unwrap().registry(3).unwrap_err();
    assert!(matches!(err, Error::UnregisteredInput { ref node, ref input } if node == "daily" && input == "events"));

    let duplicate = r#"
name: broken
nodes:
  - { kind: external_table, name: events, database: atomic }
  - { kind: external_table, name: events, database: inputs }
"#;
    let err = parse_archive(duplicate).unwrap().registry(3).unwrap_err();
    assert!(matches!(err, Error::DuplicateName(_)));

    let bad_target = r#"
name: broken
nodes:
  - { kind: external_table, name: events, database: atomic }
  - { kind: select, name: peek, inputs: [events] }
  - { kind: insert_overwrite, name: fill, target: peek, inputs: [events] }
"#;
    let err = parse_archive(bad_target).unwrap().registry(3).unwrap_err();
    assert!(matches!(err, Error::InvalidTarget { .. }));

    assert!(matches!(parse_archive("name: empty\nnodes: []\n"), Err(Error::Definition(_))));
}
