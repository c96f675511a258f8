// Drives the non-interactive subcommands of the compiled binary.
// HOME points at a temp dir so identity and results stay isolated.

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

fn tazza(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tazza").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("TAZZA_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn list_shows_bundled_texts() {
    let home = tempdir().unwrap();
    let out = stdout_of(tazza(&home).arg("list"));
    assert!(out.contains("proverb-01"));
    assert!(out.contains("passage-01"));
}

#[test]
fn login_whoami_logout() {
    let home = tempdir().unwrap();

    let out = stdout_of(tazza(&home).arg("whoami"));
    assert!(out.contains("not logged in"));

    let out = stdout_of(tazza(&home).args(["login", "morpheus"]));
    assert!(out.contains("logged in as morpheus"));

    let out = stdout_of(tazza(&home).arg("whoami"));
    assert_eq!(out.trim(), "morpheus");

    stdout_of(tazza(&home).arg("logout"));
    let out = stdout_of(tazza(&home).arg("whoami"));
    assert!(out.contains("not logged in"));
}

#[test]
fn stats_requires_login() {
    let home = tempdir().unwrap();
    tazza(&home).arg("stats").assert().failure();
}

#[test]
fn stats_and_history_for_new_user() {
    let home = tempdir().unwrap();
    stdout_of(tazza(&home).args(["login", "morpheus"]));

    let out = stdout_of(tazza(&home).arg("stats"));
    assert!(out.contains("no practice sessions yet"));

    let out = stdout_of(tazza(&home).arg("history"));
    assert!(out.contains("no practice sessions yet"));

    let csv = home.path().join("history.csv");
    let out = stdout_of(tazza(&home).args(["history", "--csv"]).arg(&csv));
    assert!(out.contains("wrote 0 sessions"));
    assert!(csv.exists());
}

#[test]
fn practice_without_tty_fails() {
    let home = tempdir().unwrap();
    tazza(&home).args(["practice", "proverb-01"]).assert().failure();
}

#[test]
fn feedback_requires_login_and_message() {
    let home = tempdir().unwrap();
    tazza(&home).args(["feedback", "more proverbs"]).assert().failure();

    stdout_of(tazza(&home).args(["login", "morpheus"]));
    tazza(&home).args(["feedback", "   "]).assert().failure();

    let out = stdout_of(tazza(&home).args(["feedback", "more proverbs"]));
    assert!(out.contains("feedback was saved"));
}
