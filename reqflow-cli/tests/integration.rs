use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const DOCUMENT: &str = r#"@greeting = hello

### Check greeting
# @name check
@expected = hello
?? {{greeting}} == {{expected}}

### Check override
# @name whoami
?? {{who}} == bob
"#;

fn write_doc(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_validate_command() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "ok.http", DOCUMENT);

    let out = Command::cargo_bin("reqflow")
        .unwrap()
        .args(["validate", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("ok:"));
}

#[test]
fn test_validate_invalid_loop() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "bad.http", "# @loop forever\nGET https://example.com\n");

    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(2); // VALIDATION_FAILED
}

#[test]
fn test_validate_missing_file() {
    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["validate", "/definitely/not/here.http"])
        .assert()
        .failure()
        .code(4); // RUNTIME_ERROR
}

#[test]
fn test_list_json() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "list.http", DOCUMENT);

    let out = Command::cargo_bin("reqflow")
        .unwrap()
        .args(["list", path.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["global", "check", "whoami"]);
    assert_eq!(entries[0]["global"], true);
}

#[test]
fn test_run_passes_with_var_override() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "run.http", DOCUMENT);

    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["run", path.to_str().unwrap(), "--var", "who=bob"])
        .assert()
        .success();
}

#[test]
fn test_run_failed_assertion() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "run.http", DOCUMENT);

    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["run", path.to_str().unwrap(), "whoami", "--var", "who=alice"])
        .assert()
        .failure()
        .code(3); // RUN_FAILED
}

#[test]
fn test_run_vars_file_json_report() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "run.http", DOCUMENT);
    let vars = write_doc(&tmp_dir, "vars.yaml", "who: bob\n");

    let out = Command::cargo_bin("reqflow")
        .unwrap()
        .args([
            "run",
            path.to_str().unwrap(),
            "--vars",
            vars.to_str().unwrap(),
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    let batch: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let reports = batch["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["name"], "check");
    assert_eq!(reports[0]["test_results"][0]["status"], "SUCCESS");
    assert_eq!(batch["cancelled"], false);
}

#[test]
fn test_run_bail_skips_rest() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(
        &tmp_dir,
        "bail.http",
        "# @name first\n?? 1 == 2\n###\n# @name second\n?? 1 == 1\n",
    );

    let out = Command::cargo_bin("reqflow")
        .unwrap()
        .args(["run", path.to_str().unwrap(), "--bail", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let batch: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(batch["reports"][1]["skipped"], true);
    assert_eq!(batch["reports"][1]["test_results"][0]["status"], "SKIPPED");
}

#[test]
fn test_run_unknown_region() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "run.http", DOCUMENT);

    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["run", path.to_str().unwrap(), "nope"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_run_unknown_event_sink() {
    let tmp_dir = TempDir::new().unwrap();
    let path = write_doc(&tmp_dir, "run.http", DOCUMENT);

    Command::cargo_bin("reqflow")
        .unwrap()
        .args(["run", path.to_str().unwrap(), "--events", "kafka"])
        .assert()
        .failure()
        .code(4);
}
