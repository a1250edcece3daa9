use assert_cmd::Command;
use predicates::prelude::*;

fn repurposer() -> Command {
    Command::cargo_bin("repurposer").unwrap()
}

#[test]
fn help_lists_subcommands() {
    repurposer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("repurpose"))
        .stdout(predicate::str::contains("platforms"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn repurpose_help_shows_options() {
    repurposer()
        .args(["repurpose", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("URL_OR_FILE"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn platforms_lists_limits() {
    // Keep any config.yaml on this machine out of the picture
    let home = tempfile::tempdir().unwrap();

    repurposer()
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blog Post (long_form): up to 500 words, 1 per video"))
        .stdout(predicate::str::contains("LinkedIn Post (micro_professional): up to 100 words, 2 per video"))
        .stdout(predicate::str::contains("Twitter Post (micro_social): up to 280 characters, 5 per video"))
        .stdout(predicate::str::contains("YouTube"))
        .stdout(predicate::str::contains("Local transcript file (.txt, .vtt)"));
}

#[test]
fn platforms_reads_local_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        "platforms:\n  micro_social:\n    limit: 200\n",
    )
    .unwrap();

    repurposer()
        .current_dir(dir.path())
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("Twitter Post (micro_social): up to 200 characters, 5 per video"))
        .stdout(predicate::str::contains("Blog Post (long_form): up to 500 words, 1 per video"));
}

#[test]
fn repurpose_requires_a_source() {
    repurposer()
        .arg("repurpose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL_OR_FILE"));
}

#[test]
fn unknown_format_is_rejected() {
    repurposer()
        .args(["repurpose", "talk.txt", "--format", "srt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
