//! End-to-end tests driving the `stringer` binary against temporary
//! repositories.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn stringer() -> Command {
    Command::cargo_bin("stringer").expect("binary builds")
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

#[test]
fn scan_emits_one_bead_line_per_todo() {
    let td = tempdir().expect("tempdir");
    write(
        &td.path().join("src/main.rs"),
        "fn main() {}\n// TODO: wire up the frobnicator\n",
    );

    stringer()
        .args(["scan", "--collector", "todos", "--no-state"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::is_match(r#""id":"str-[0-9a-f]{8}""#).unwrap())
        .stdout(predicate::str::contains("\"type\":\"task\""))
        .stdout(predicate::str::contains("\"status\":\"open\""))
        .stdout(predicate::str::contains("stringer-generated"))
        .stdout(predicate::str::contains("\"todos\""));
}

#[test]
fn scan_of_clean_repo_emits_nothing() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("src/lib.rs"), "pub fn clean() {}\n");

    stringer()
        .args(["scan", "--collector", "todos", "--no-state"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn markdown_format_renders_report() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// FIXME: broken parse\n");

    stringer()
        .args([
            "scan",
            "--collector",
            "todos",
            "--no-state",
            "--format",
            "markdown",
        ])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Stringer Scan Report"))
        .stdout(predicate::str::contains("**broken parse**"));
}

#[test]
fn sarif_format_is_valid_json_with_run_name() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: x\n");

    let output = stringer()
        .args([
            "scan",
            "--collector",
            "todos",
            "--no-state",
            "--format",
            "sarif",
        ])
        .arg("--repo")
        .arg(td.path())
        .output()
        .expect("run");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid SARIF JSON");
    assert_eq!(parsed["version"], "2.1.0");
    assert_eq!(parsed["runs"][0]["tool"]["driver"]["name"], "stringer");
}

#[test]
fn unknown_format_lists_available() {
    let td = tempdir().expect("tempdir");

    stringer()
        .args(["scan", "--no-state", "--format", "nope"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("available"));
}

#[test]
fn unknown_collector_is_a_configuration_error() {
    let td = tempdir().expect("tempdir");

    stringer()
        .args(["scan", "--no-state", "--collector", "nope"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown collector"));
}

#[test]
fn listings_cover_builtins() {
    stringer()
        .arg("collectors")
        .assert()
        .success()
        .stdout(predicate::str::contains("todos"))
        .stdout(predicate::str::contains("churn"));

    stringer()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("beads"))
        .stdout(predicate::str::contains("sarif"))
        .stdout(predicate::str::contains("html-dir"));

    stringer()
        .arg("sections")
        .assert()
        .success()
        .stdout(predicate::str::contains("churn"))
        .stdout(predicate::str::contains("todo-age"));
}

#[test]
fn existing_beads_suppress_known_signals() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: add rate limiting\n");
    write(
        &td.path().join(".beads/issues.jsonl"),
        "{\"id\":\"other-1\",\"title\":\"todo: add rate limiting\",\"status\":\"closed\",\"priority\":2}\n",
    );

    stringer()
        .args(["scan", "--collector", "todos", "--no-state"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn scan_then_diff_reports_new_signal() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: first\n");

    stringer()
        .args(["scan", "--collector", "todos"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success();

    write(&td.path().join("a.rs"), "// TODO: first\n// TODO: second\n");

    stringer()
        .args(["diff", "--collector", "todos"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Changes since last scan"))
        .stdout(predicate::str::contains("+ 1 new signal(s)"))
        .stdout(predicate::str::contains("second"));
}

#[test]
fn diff_without_prior_state_fails() {
    let td = tempdir().expect("tempdir");

    stringer()
        .args(["diff", "--collector", "todos"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no prior scan state"));
}

#[test]
fn report_skips_sections_without_metrics() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: x\n");

    stringer()
        .args(["report", "--collector", "todos"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("## todo-age"))
        .stdout(predicate::str::contains("## churn (skipped: churn)"));
}

#[test]
fn report_json_marks_status() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: x\n");

    let output = stringer()
        .args(["report", "--json", "--collector", "todos"])
        .arg("--repo")
        .arg(td.path())
        .output()
        .expect("run");
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let reports = parsed.as_array().expect("array");
    let todo_age = reports
        .iter()
        .find(|r| r["name"] == "todo-age")
        .expect("todo-age section");
    assert_eq!(todo_age["status"], "ok");
    let churn = reports
        .iter()
        .find(|r| r["name"] == "churn")
        .expect("churn section");
    assert_eq!(churn["status"], "skipped");
}

#[test]
fn html_dir_requires_output_and_writes_files() {
    let td = tempdir().expect("tempdir");
    write(&td.path().join("a.rs"), "// TODO: x\n");

    stringer()
        .args(["scan", "--collector", "todos", "--no-state", "--format", "html-dir"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires --output"));

    let out = td.path().join("dash");
    stringer()
        .args(["scan", "--collector", "todos", "--no-state", "--format", "html-dir"])
        .arg("--repo")
        .arg(td.path())
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("index.html").exists());
    assert!(out.join("data.json").exists());
}

#[test]
fn config_file_sets_format_and_excludes() {
    let td = tempdir().expect("tempdir");
    write(
        &td.path().join(".stringer.toml"),
        "[scan]\ncollectors = [\"todos\"]\nexclude = [\"vendor/**\"]\n\n[output]\nformat = \"markdown\"\n",
    );
    write(&td.path().join("vendor/dep.rs"), "// TODO: vendored\n");
    write(&td.path().join("mine.rs"), "// TODO: mine\n");

    stringer()
        .args(["scan", "--no-state"])
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Stringer Scan Report"))
        .stdout(predicate::str::contains("**mine**"))
        .stdout(predicate::str::contains("vendored").not());
}

#[test]
fn doctor_prints_environment() {
    let td = tempdir().expect("tempdir");

    stringer()
        .arg("doctor")
        .arg("--repo")
        .arg(td.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("collectors: churn, todos"))
        .stdout(predicate::str::contains("state_file: absent"));
}

#[test]
fn max_issues_caps_output() {
    let td = tempdir().expect("tempdir");
    write(
        &td.path().join("a.rs"),
        "// TODO: one\n// TODO: two\n// TODO: three\n",
    );

    let output = stringer()
        .args([
            "scan",
            "--collector",
            "todos",
            "--no-state",
            "--max-issues",
            "2",
        ])
        .arg("--repo")
        .arg(td.path())
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
}
