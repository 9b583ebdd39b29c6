#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn cli(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("roulement-cli").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn configure(config: &Path, nurses: &str) {
    cli(config)
        .args(["config", "set", "--month", "9", "--year", "2025", "--nurses", nurses])
        .assert()
        .success();
}

fn twelve() -> String {
    (0..12).map(|i| format!("n{i}")).collect::<Vec<_>>().join(",")
}

#[test]
fn config_set_then_show() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, "ana, ben ,,cleo");
    assert!(config.exists());
    cli(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ana\"").and(predicate::str::contains("\"cleo\"")))
        .stdout(predicate::str::contains("2025"));
}

#[test]
fn config_set_rejects_bad_month() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    cli(&config)
        .args(["config", "set", "--month", "13"])
        .assert()
        .failure();
    assert!(!config.exists());
}

#[test]
fn calendar_summary() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, "ana,ben");
    cli(&config)
        .arg("calendar")
        .assert()
        .success()
        .stdout(predicate::str::contains("period: 2025-09"))
        .stdout(predicate::str::contains("days: 30"))
        .stdout(predicate::str::contains("weekend days: 6,7,13,14,20,21,27,28"))
        .stdout(predicate::str::contains("required hours: 176"));
}

#[test]
fn template_is_written() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, "ana,ben");
    let out = dir.path().join("requests.csv");
    cli(&config)
        .args(["template", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Template written to"));
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Nurse,1,2,"));
    assert!(text.contains("\nben,"));
}

#[test]
fn generate_writes_the_schedule() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, &twelve());
    let requests = dir.path().join("requests.csv");
    std::fs::write(&requests, "Nurse,1,5,6\nn0,,N,\nn1,,,CO\nn3,Z,,\n").unwrap();
    let out = dir.path().join("planning.csv");
    cli(&config)
        .arg("generate")
        .arg("--preassign")
        .arg(&requests)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Schedule written to"));
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\nShift Summary\n"));
    assert_eq!(text.lines().filter(|l| l.ends_with(",176")).count(), 12);
}

#[test]
fn generate_reports_infeasible_with_exit_code_2() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, "solo");
    let out = dir.path().join("planning.csv");
    cli(&config)
        .arg("generate")
        .arg("--out")
        .arg(&out)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No schedule satisfies every rule"));
    assert!(!out.exists());
}

#[test]
fn generate_rejects_bad_rule_overrides() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    configure(&config, &twelve());
    cli(&config)
        .args(["generate", "--rule", "weekday.lunch.min=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("weekday.lunch.min"));
    cli(&config)
        .args(["generate", "--rule", "min_night"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}
