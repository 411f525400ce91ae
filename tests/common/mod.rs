#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Git-backed tests return early when no `git` executable is available.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a throwaway identity and fail the test on error.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Skipmark Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn current_branch(repo: &Path) -> String {
    git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// A work tree root plus a separate directory holding bare remotes.
pub struct Fixture {
    work: TempDir,
    remotes: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            work: TempDir::new().expect("create work dir"),
            remotes: TempDir::new().expect("create remotes dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.work.path()
    }

    /// Repository at `rel` with one commit and no remote.
    pub fn local_repo(&self, rel: &str) -> PathBuf {
        let repo = self.root().join(rel);
        fs::create_dir_all(repo.join("src")).unwrap();
        git(&repo, &["init", "--quiet"]);
        fs::write(repo.join("README.md"), "# test\n").unwrap();
        fs::write(repo.join("src/main.rs"), "fn main() {}\n").unwrap();
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "--quiet", "-m", "initial"]);
        repo
    }

    /// Repository at `rel` whose only branch is pushed to a bare remote and tracks it.
    pub fn pushed_repo(&self, rel: &str) -> PathBuf {
        let repo = self.local_repo(rel);
        let remote = self.remote_path(rel);
        fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--quiet", "--bare"]);
        git(&repo, &["remote", "add", "origin", remote.to_str().unwrap()]);
        git(&repo, &["push", "--quiet", "-u", "origin", "HEAD"]);
        repo
    }

    pub fn remote_path(&self, rel: &str) -> PathBuf {
        self.remotes
            .path()
            .join(format!("{}.git", rel.replace('/', "_")))
    }
}
