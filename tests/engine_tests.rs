//! Integration tests for the config build engine
//!
//! These run full passes over real config trees in temporary directories
//! and read the written task list back.

use autobuild::check::{check_tasks, CheckOutcome};
use autobuild::{
    ActionRegistry, BuildConfig, BuildError, BuildInfo, ConfigBuilder, FactTable, FileTransport,
    TaskEntry, TransportError,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn facts() -> FactTable {
    let mut facts = FactTable::new();
    facts.set("os_code", "win10");
    facts.set("computer_model", "HP Z640 Workstation");
    facts.set_all("device_id", vec!["PCI\\VEN_8086".to_string(), "PCI\\VEN_10DE".to_string()]);
    facts
}

fn builder(dir: &TempDir) -> ConfigBuilder<FileTransport> {
    ConfigBuilder::new(BuildInfo::new(facts()), FileTransport::new(dir.path()))
}

fn names(tasks: &[TaskEntry]) -> Vec<String> {
    tasks
        .iter()
        .map(|t| match t.timer_name() {
            Some(timer) => timer.to_string(),
            None => t.name().unwrap_or("?").to_string(),
        })
        .collect()
}

// =============================================================================
// Full Passes
// =============================================================================

#[test]
fn test_full_tree_with_includes_templates_and_pins() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/build.yaml",
        r#"
templates:
  registry_base:
    RegAdd: ['HKLM', 'SOFTWARE\Build', 'Stage', 'base', 'REG_SZ']
controls:
  - template: [registry_base]
  - pin:
      os_code: [win10]
    include:
      - ['drivers/', 'drivers.yaml']
  - pin:
      os_code: [win7]
    include:
      - ['legacy/', 'build.yaml']
  - CopyFile: ['C:\input.txt', 'C:\output.txt']
"#,
    );
    write(
        dir.path(),
        "config/drivers/drivers.yaml",
        r#"
controls:
  - pin:
      device_id: ['PCI\VEN_10DE']
    Driver: [nvidia]
  - pin:
      device_id: ['PCI\VEN_1002']
    Driver: [amd]
  - pin:
      computer_model: ['!VMWare Virtual Platform']
    Driver: [chipset]
"#,
    );

    let out = dir.path().join("task_list.yaml");
    let mut cb = builder(&dir);
    cb.start(&out, "config").unwrap();

    let written = FileTransport::read_tasks(&out).unwrap();
    assert_eq!(written, cb.task_list());
    assert_eq!(
        names(&written),
        vec![
            "start_config_build.yaml",
            "RegAdd",
            "start_config/drivers_drivers.yaml",
            "Driver",
            "Driver",
            "stop_config/drivers_drivers.yaml",
            "CopyFile",
            "stop_config_build.yaml",
        ]
    );

    // Included entries carry the include's config path
    assert_eq!(written[3].path, vec!["drivers"]);
    assert_eq!(written[3].args().unwrap()[0], "nvidia");
    assert_eq!(written[4].args().unwrap()[0], "chipset");
    assert!(written[6].path.is_empty());
}

#[test]
fn test_repeated_builds_append_to_task_list() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "build.yaml", "controls:\n  - CopyFile: [a, b]\n");

    let out = dir.path().join("task_list.yaml");
    let mut cb = builder(&dir);
    cb.start(&out, "").unwrap();
    cb.start(&out, "").unwrap();

    let written = FileTransport::read_tasks(&out).unwrap();
    assert_eq!(written.len(), 6);
    assert_eq!(&written[..3], &written[3..]);
}

#[test]
fn test_redirect_to_local_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "primary/build.yaml",
        "controls:\n  - Before: [1]\n  - ServerChangeEvent: ['', 'secondary']\n  - Never: [0]\n",
    );
    write(dir.path(), "secondary/build.yaml", "controls:\n  - After: [2]\n");

    let out = dir.path().join("task_list.yaml");
    let mut cb = builder(&dir);
    cb.start(&out, "primary").unwrap();

    assert_eq!(
        names(&FileTransport::read_tasks(&out).unwrap()),
        vec![
            "start_primary_build.yaml",
            "Before",
            "stop_primary_build.yaml",
            "start_secondary_build.yaml",
            "After",
            "stop_secondary_build.yaml",
        ]
    );
}

#[test]
fn test_chooser_answers_drive_later_pins() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "build.yaml",
        r#"
controls:
  - ShowChooser:
      - name: edition
        type: radio
        prompt: Windows edition
        options:
          - {label: Pro, value: pro, default: true}
          - {label: Enterprise, value: enterprise}
  - pin:
      USER_edition: [pro]
    Edition: [pro]
  - pin:
      USER_edition: ['!pro']
    Edition: [other]
"#,
    );

    let out = dir.path().join("task_list.yaml");
    let mut cb = builder(&dir);
    cb.start(&out, "").unwrap();

    let tasks = cb.task_list();
    assert_eq!(names(tasks), vec!["start__build.yaml", "Edition", "stop__build.yaml"]);
    assert_eq!(tasks[1].args().unwrap()[0], "pro");
    assert_eq!(cb.build_info().chooser_response("edition"), Some("pro"));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_pass_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "build.yaml",
        "controls:\n  - Queued: [1]\n  - include: [['missing/', 'build.yaml']]\n",
    );

    let out = dir.path().join("task_list.yaml");
    let err = builder(&dir).start(&out, "").unwrap_err();
    assert!(matches!(err, BuildError::Transport(TransportError::NotFound { .. })));
    assert!(!out.exists());
}

#[test]
fn test_malformed_document_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "build.yaml", "controls:\n  - pin: [not, a, mapping]\n");

    let err = builder(&dir)
        .start(&dir.path().join("out.yaml"), "")
        .unwrap_err();
    assert!(matches!(err, BuildError::Transport(TransportError::Parse { .. })));
}

#[test]
fn test_remote_root_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "build.yaml",
        "controls:\n  - ServerChangeEvent: ['https://glazier.example.com', '/']\n",
    );

    let err = builder(&dir)
        .start(&dir.path().join("out.yaml"), "")
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Transport(TransportError::UnsupportedRoot { .. })
    ));
}

// =============================================================================
// Config-Driven Build and Check
// =============================================================================

#[test]
fn test_build_from_config_then_check() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "srv/win10/build.yaml",
        r#"
controls:
  - pin:
      os_code: [win10]
    RegAdd: ['HKLM', 'SOFTWARE\Build', 'Count', 3, 'REG_DWORD']
    MultiRegDel:
      - ['HKLM', 'SOFTWARE\Build', 'Old']
      - ['HKLM', 'SOFTWARE\Build', 'Older', false]
    RegDel: ['HKLM', 'SOFTWARE\Build']
    CopyFile: [a, b]
"#,
    );

    let mut config = BuildConfig::default();
    config.config_server = dir.path().join("srv").display().to_string();
    config.config_root_path = "win10".to_string();
    config.task_list = dir.path().join("out").join("task_list.yaml");
    config.facts.insert("os_code".to_string(), "win10".to_string());
    config.validate().unwrap();
    assert!(config.prepare_task_list().unwrap());

    let build = BuildInfo::new(config.fact_table().unwrap())
        .with_config_server(config.config_server.as_str())
        .with_reg_64(config.use_reg_64);
    let mut cb = ConfigBuilder::new(build, FileTransport::new(dir.path()));
    cb.start_with_file(&config.task_list, &config.initial_root(), &config.build_file)
        .unwrap();

    let tasks = FileTransport::read_tasks(&config.task_list).unwrap();
    let checks = check_tasks(&ActionRegistry::with_core_actions(), &tasks);
    let outcomes: Vec<(String, CheckOutcome)> = checks
        .into_iter()
        .map(|c| (c.name.unwrap_or_default(), c.outcome))
        .collect();

    assert_eq!(outcomes.len(), 6);
    assert_eq!(outcomes[1], ("RegAdd".to_string(), CheckOutcome::Valid));
    assert_eq!(outcomes[2], ("MultiRegDel".to_string(), CheckOutcome::Valid));
    assert!(matches!(&outcomes[3], (name, CheckOutcome::Invalid(_)) if name == "RegDel"));
    assert_eq!(outcomes[4], ("CopyFile".to_string(), CheckOutcome::Unknown));

    // A second run with preserve_tasks keeps the list and skips the build
    config.preserve_tasks = true;
    assert!(!config.prepare_task_list().unwrap());
}
