use std::env;
use std::path::Path;
use std::process::Command;

/// Git program to invoke. Overridable for tests via `STRINGER_GIT`.
pub(crate) fn git_program() -> String {
    env::var("STRINGER_GIT").unwrap_or_else(|_| "git".to_string())
}

/// Current commit SHA of the repository at `repo_root`.
/// Returns None when git is unavailable or the path is not a repository.
pub fn head_commit(repo_root: &Path) -> Option<String> {
    let output = Command::new(git_program())
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(repo_root)
        .output()
        .ok()?;

    if output.status.success() {
        let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if head.is_empty() { None } else { Some(head) }
    } else {
        None
    }
}
