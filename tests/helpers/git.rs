use std::{path::Path, process::Command};

/// Run `git` with `args` in `path`, panicking with stderr if it fails. Returns stdout.
fn git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a Git repo in `path` with some fake config.
pub fn init(path: &Path) {
    git(path, &["init", "--initial-branch=main"]);
    git(path, &["config", "user.email", "fake@changelog-notify.dev"]);
    git(path, &["config", "user.name", "Fake notifier"]);
    git(path, &["config", "commit.gpgsign", "false"]);
}

/// Stage everything in `path` and commit it with `message`.
pub fn commit_all(path: &Path, message: &str) {
    git(path, &["add", "."]);
    git(path, &["commit", "--allow-empty", "-m", message]);
}

/// The full SHA of `revision`.
pub fn rev_parse(path: &Path, revision: &str) -> String {
    git(path, &["rev-parse", revision])
}
