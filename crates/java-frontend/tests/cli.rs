//! End-to-end runs of the java-frontend binary on temporary workspaces.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::Value;

const CLEAN: &str = "class Clean {\n    int twice(int x) {\n        return x * 2;\n    }\n}\n";

const NOISY: &str = "import java.util.List;\n\nclass Noisy {\n    int x;\n    void f() {\n        x = x;\n    }\n}\n";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run(root: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_java-frontend"))
        .arg("--workspace")
        .arg(root)
        .args(extra)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_clean_workspace_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Clean.java", CLEAN);

    let output = run(dir.path(), &[]);
    assert!(output.status.success());
    assert!(stdout(&output).ends_with("java-frontend found 0 errors and 0 warnings in 1 file\n"));
}

#[test]
fn test_warnings_fail_only_on_request() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Noisy.java", NOISY);

    let output = run(dir.path(), &["--output", "machine"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("WARNING")).collect();
    assert_eq!(
        lines,
        vec![
            "WARNING src/Noisy.java:6:9:6:14 The assignment to variable x has no effect (assignment-has-no-effect)",
            "WARNING src/Noisy.java:1:8:1:22 The import java.util.List is never used (unused-import)",
        ]
    );

    let output = run(dir.path(), &["--fail-on-warnings"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_parse_errors_fail() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Broken.java", "class Broken { void f() { int = ; } }\n");

    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("(parse-error)"));
}

#[test]
fn test_json_output() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Noisy.java", NOISY);
    write(dir.path(), "src/Clean.java", CLEAN);

    let output = run(dir.path(), &["--output", "json"]);
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "Warning");
    assert_eq!(entries[0]["filename"], "src/Noisy.java");
    assert_eq!(entries[0]["code"], "assignment-has-no-effect");
}

#[test]
fn test_project_file_excludes_and_ignore_flag() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Clean.java", CLEAN);
    write(dir.path(), "generated/Noisy.java", NOISY);
    write(dir.path(), "legacy/Noisy.java", NOISY);
    write(
        dir.path(),
        "java-frontend.json",
        "{\n  // generated sources are checked elsewhere\n  \"exclude\": [\"generated/**\"],\n  \"javaVersion\": \"1.8\"\n}\n",
    );

    let output = run(dir.path(), &["--ignore", "legacy/**"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).ends_with("in 1 file\n"));
}

#[test]
fn test_emit_cfg_goes_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Clean.java", CLEAN);

    let output = run(dir.path(), &["--emit-cfg"]);
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("=== CFG for src/Clean.java ===\n--- twice ---\nStarts at B1\n"), "{stderr}");
    assert!(stderr.contains("B0 (Exit):"), "{stderr}");
}

#[test]
fn test_cache_is_reused_and_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    write(dir.path(), "src/Noisy.java", NOISY);
    let cache_arg = cache.to_str().unwrap();

    let first = stdout(&run(dir.path(), &["--cache-dir", cache_arg]));
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
    let second = stdout(&run(dir.path(), &["--cache-dir", cache_arg]));
    assert_eq!(first, second);

    write(dir.path(), "src/Noisy.java", CLEAN);
    let third = stdout(&run(dir.path(), &["--cache-dir", cache_arg]));
    assert!(third.ends_with("found 0 errors and 0 warnings in 1 file\n"), "{third}");
}

#[test]
fn test_invalid_ignore_glob_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--ignore", "a["]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid glob pattern"), "{stderr}");
}
