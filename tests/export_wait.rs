use pbix_doc::config::Config;
use pbix_doc::error::{exit_code, RunError};
use pbix_doc::export::tabular_editor::{
    candidate_paths, export_script, locate_executable, wait_for_file, TabularEditor,
};
use std::path::Path;
use std::time::Duration;

#[test]
fn missing_export_times_out_with_its_own_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("documentation.tsv");
    let err = wait_for_file(&path, Duration::from_millis(30), Duration::from_millis(5))
        .expect_err("timeout");
    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::ExportTimeout { .. })
    ));
    assert_eq!(exit_code(&err), 4);
}

#[test]
fn existing_export_returns_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("documentation.tsv");
    std::fs::write(&path, "Object\tName\n").expect("write");
    wait_for_file(&path, Duration::from_millis(0), Duration::from_millis(5)).expect("present");
}

#[test]
fn explicit_executable_is_searched_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = dir.path().join("TabularEditor.exe");
    std::fs::write(&exe, b"").expect("write");

    let mut cfg = Config::default();
    cfg.export.executable = exe.display().to_string();
    cfg.export.search_dirs = vec![dir.path().join("nowhere").display().to_string()];

    let candidates = candidate_paths(&cfg);
    assert_eq!(candidates[0], exe);
    assert_eq!(
        candidates[1],
        dir.path().join("nowhere").join("Tabular Editor").join("TabularEditor.exe")
    );
    assert_eq!(locate_executable(&cfg), Some(exe));
}

#[test]
fn missing_exporter_has_its_own_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = Config::default();
    cfg.export.search_dirs = vec![dir.path().display().to_string()];
    let err = match TabularEditor::new(&cfg) {
        Ok(_) => panic!("exporter should not be found"),
        Err(err) => err,
    };
    assert_eq!(exit_code(&err), 3);
}

#[test]
fn script_saves_to_forward_slash_path() {
    let script = export_script(Path::new("C:\\work\\report\\documentation.tsv"));
    assert!(script.contains("SaveFile(\"C:/work/report/documentation.tsv\", tsv);"));
    assert!(script.contains("ExportProperties(objects)"));
}

#[cfg(unix)]
#[test]
fn hung_exporter_is_killed_at_process_timeout() {
    use pbix_doc::export::ModelExporter;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Instant;

    let dir = tempfile::tempdir().expect("tempdir");
    let exe = dir.path().join("fake-exporter.sh");
    // The backgrounded sleep keeps the output pipes open after the shell is killed.
    std::fs::write(&exe, "#!/bin/sh\nsleep 30 &\nsleep 30\n").expect("write");
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).expect("chmod");

    let mut cfg = Config::default();
    cfg.export.executable = exe.display().to_string();
    cfg.export.process_timeout_seconds = 1;
    let exporter = TabularEditor::new(&cfg).expect("exporter");

    let model = dir.path().join("Sales.bim");
    std::fs::write(&model, "{}").expect("write model");
    let started = Instant::now();
    let err = exporter
        .export(&model, &dir.path().join("job"))
        .expect_err("timeout");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::ExporterTimeout { .. })
    ));
    assert_eq!(exit_code(&err), 4);
}
