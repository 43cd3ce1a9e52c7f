use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn help_lists_top_level_subcommands() {
    let mut cmd = Command::cargo_bin("foundry").unwrap();
    cmd.arg("--help");
    cmd.assert().success().stdout(contains("build"));
}

#[test]
fn settings_get_on_missing_key_prints_null_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("foundry").unwrap();
    cmd.args([
        "--project-directory",
        dir.path().to_str().unwrap(),
        "--format",
        "json",
        "settings",
        "get",
        "build",
        "jobs",
    ]);
    cmd.assert().success().stdout(contains("null"));
}

#[test]
fn secret_round_trips_through_cli() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().to_str().unwrap();

    Command::cargo_bin("foundry")
        .unwrap()
        .args([
            "--project-directory",
            project,
            "secret",
            "set-api-key",
            "api.example.com",
            "chat",
            "sk-test-123",
        ])
        .assert()
        .success();

    Command::cargo_bin("foundry")
        .unwrap()
        .args([
            "--project-directory",
            project,
            "secret",
            "get-api-key",
            "api.example.com",
            "chat",
        ])
        .assert()
        .success()
        .stdout(contains("sk-test-123"));
}

#[test]
fn template_create_reports_no_provider() {
    let mut cmd = Command::cargo_bin("foundry").unwrap();
    cmd.args(["template", "create", "rust-cli"]);
    cmd.assert().failure().stderr(contains("no template provider"));
}
