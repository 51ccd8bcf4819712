use std::process::{Command, Output};

fn osdr_fetch(args: &[&str]) -> Output {
    let temp = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_osdr-fetch"))
        .args(args)
        .current_dir(temp.path())
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn usage_errors_exit_with_configuration_code() {
    let conflicting = osdr_fetch(&["--osd", "OSD-1", "--processed-only", "--raw-only"]);
    assert_eq!(conflicting.status.code(), Some(1));

    let missing = osdr_fetch(&[]);
    assert_eq!(missing.status.code(), Some(1));

    let unknown = osdr_fetch(&["--osd", "OSD-1", "--no-such-flag"]);
    assert_eq!(unknown.status.code(), Some(1));
}

#[test]
fn usage_errors_are_not_confused_with_nothing_found() {
    use osdr_fetch::report::RunStatus;

    let output = osdr_fetch(&[]);
    assert_ne!(output.status.code(), Some(RunStatus::NothingFound.exit_code() as i32));
}

#[test]
fn invalid_dataset_fails_before_network() {
    let output = osdr_fetch(&["--osd", "GLDS-48", "--list"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid dataset identifier"));
}

#[test]
fn help_and_version_exit_cleanly() {
    let help = osdr_fetch(&["--help"]);
    assert_eq!(help.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&help.stdout).contains("--osd"));

    let version = osdr_fetch(&["--version"]);
    assert_eq!(version.status.code(), Some(0));
}
