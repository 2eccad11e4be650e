use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_replay_end_to_end() {
    let mut cmd = Command::new(cargo_bin!("etransfer-relay"));
    cmd.arg("replay").arg("tests/fixtures/notifications.csv");

    // Against an empty store every notification is unrelated mail: all three
    // rows parse, none match, and the run still succeeds.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("processed=3"))
        .stdout(predicate::str::contains("matched=0"))
        .stdout(predicate::str::contains("dropped=3"))
        .stdout(predicate::str::contains("errors=0"));
}

#[test]
fn test_replay_missing_file_fails() {
    let mut cmd = Command::new(cargo_bin!("etransfer-relay"));
    cmd.arg("replay").arg("tests/fixtures/does-not-exist.csv");

    cmd.assert().failure();
}
