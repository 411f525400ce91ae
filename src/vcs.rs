//! Git queries and the cleanliness decision for working copies.
//!
//! Every query runs the `git` executable with `-C <repo>`, so nothing here
//! depends on the process working directory. Failures are classified from
//! exit codes and dedicated probes instead of matching stderr text.

use crate::config::ReservedFiles;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::{Command, Output};

/// Name of the directory (or file, for worktrees and submodules) that marks a git working copy.
pub const GIT_DIR: &str = ".git";

/// True when `dir` looks like a git working copy.
pub fn has_vcs_marker(dir: &Path) -> bool {
    dir.join(GIT_DIR).exists()
}

/// Structured result of a single git query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome<T> {
    Success(T),
    /// The branch has no upstream configured
    NoUpstream,
    /// The repository has no commits yet
    NoCommits,
    /// The configured upstream does not resolve to a commit
    UnknownRevision,
    OtherFailure(String),
}

/// Thin wrapper around the `git` executable.
#[derive(Debug, Clone)]
pub struct Git {
    program: OsString,
}

impl Default for Git {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Git {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, repo: &Path, args: &[&str]) -> Result<Output, String> {
        Command::new(&self.program)
            .arg("-C")
            .arg(repo)
            .args(args)
            .output()
            .map_err(|e| format!("failed to run git: {}", e))
    }

    /// Paths with working-copy changes (tracked or untracked), relative to `repo`.
    pub fn changed_paths(&self, repo: &Path) -> GitOutcome<Vec<String>> {
        match self.run(
            repo,
            &["status", "--porcelain", "-z", "--untracked-files=all"],
        ) {
            Ok(output) if output.status.success() => {
                GitOutcome::Success(parse_porcelain_z(&output.stdout))
            }
            Ok(output) => GitOutcome::OtherFailure(stderr_message(&output)),
            Err(e) => GitOutcome::OtherFailure(e),
        }
    }

    /// Short names of all local branches.
    pub fn local_branches(&self, repo: &Path) -> GitOutcome<Vec<String>> {
        match self.run(
            repo,
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
        ) {
            Ok(output) if output.status.success() => GitOutcome::Success(
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            Ok(output) => GitOutcome::OtherFailure(stderr_message(&output)),
            Err(e) => GitOutcome::OtherFailure(e),
        }
    }

    /// Resolve the upstream of `branch` to its short name (for example `origin/main`).
    ///
    /// Only existence of a resolvable upstream is checked; the upstream is
    /// not compared with the local branch.
    pub fn upstream(&self, repo: &Path, branch: &str) -> GitOutcome<String> {
        // `git config --get` exits with 1 when the key is absent
        let merge_key = format!("branch.{}.merge", branch);
        match self.run(repo, &["config", "--get", &merge_key]) {
            Ok(output) if output.status.success() => {}
            Ok(output) if output.status.code() == Some(1) => return GitOutcome::NoUpstream,
            Ok(output) => return GitOutcome::OtherFailure(stderr_message(&output)),
            Err(e) => return GitOutcome::OtherFailure(e),
        }

        let upstream_rev = format!("{}@{{u}}", branch);
        match self.run(repo, &["rev-parse", "--verify", "--quiet", &upstream_rev]) {
            Ok(output) if output.status.success() => {
                let name = self
                    .run(repo, &["rev-parse", "--abbrev-ref", &upstream_rev])
                    .ok()
                    .filter(|o| o.status.success())
                    .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| String::from_utf8_lossy(&output.stdout).trim().to_string());
                GitOutcome::Success(name)
            }
            Ok(_) => {
                if self.has_commits(repo) {
                    GitOutcome::UnknownRevision
                } else {
                    GitOutcome::NoCommits
                }
            }
            Err(e) => GitOutcome::OtherFailure(e),
        }
    }

    fn has_commits(&self, repo: &Path) -> bool {
        self.run(repo, &["rev-parse", "--verify", "--quiet", "HEAD"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Names of the configured remotes, in git's order.
    pub fn remotes(&self, repo: &Path) -> GitOutcome<Vec<String>> {
        match self.run(repo, &["remote"]) {
            Ok(output) if output.status.success() => GitOutcome::Success(
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            Ok(output) => GitOutcome::OtherFailure(stderr_message(&output)),
            Err(e) => GitOutcome::OtherFailure(e),
        }
    }

    /// The fetch URL of `remote`, if configured.
    pub fn remote_url(&self, repo: &Path, remote: &str) -> Option<String> {
        let key = format!("remote.{}.url", remote);
        self.run(repo, &["config", "--get", &key])
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("git exited with {}", output.status)
    } else {
        stderr
    }
}

/// Extract paths from `git status --porcelain -z` output.
///
/// Each record is `XY path`; renames and copies are followed by an extra
/// record holding the original path, which is skipped.
fn parse_porcelain_z(stdout: &[u8]) -> Vec<String> {
    let mut paths = Vec::new();
    let mut records = stdout.split(|b| *b == 0).filter(|r| !r.is_empty());

    while let Some(record) = records.next() {
        if record.len() < 4 {
            continue;
        }
        let status = &record[..2];
        paths.push(String::from_utf8_lossy(&record[3..]).into_owned());
        if status.contains(&b'R') || status.contains(&b'C') {
            records.next();
        }
    }

    paths
}

/// Why a working copy must be backed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyReason {
    UncommittedChanges(Vec<String>),
    StatusFailed(String),
    BranchListFailed(String),
    NoUpstream { branch: String },
    NoCommits { branch: String },
    UnknownRevision { branch: String },
    UpstreamFailed { branch: String, message: String },
}

impl fmt::Display for DirtyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UncommittedChanges(paths) => {
                write!(f, "{} uncommitted change(s)", paths.len())?;
                if let Some(first) = paths.first() {
                    write!(f, ", first: {}", first)?;
                }
                Ok(())
            }
            Self::StatusFailed(msg) => write!(f, "status query failed: {}", msg),
            Self::BranchListFailed(msg) => write!(f, "branch listing failed: {}", msg),
            Self::NoUpstream { branch } => write!(f, "no upstream configured for branch {}", branch),
            Self::NoCommits { branch } => write!(f, "no commits in the branch {}", branch),
            Self::UnknownRevision { branch } => {
                write!(f, "unknown commit for the upstream of branch {}", branch)
            }
            Self::UpstreamFailed { branch, message } => {
                write!(f, "upstream lookup failed for branch {}: {}", branch, message)
            }
        }
    }
}

/// Outcome of the cleanliness check. Clean when there are no reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub reasons: Vec<DirtyReason>,
}

impl Verdict {
    pub fn is_clean(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Decides whether a working copy can be left out of a backup.
pub trait CleanlinessOracle {
    /// True when `repo` has nothing that a fresh clone would not restore.
    fn is_clean(&self, repo: &Path) -> bool;

    /// URL to clone `repo` from, if one is known.
    fn remote_url(&self, repo: &Path) -> Option<String>;
}

/// [`CleanlinessOracle`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitOracle {
    git: Git,
    /// File names written by this tool, never counted as changes
    reserved: Vec<String>,
}

impl GitOracle {
    pub fn new(files: &ReservedFiles) -> Self {
        Self::with_git(Git::default(), files)
    }

    pub fn with_git(git: Git, files: &ReservedFiles) -> Self {
        Self {
            git,
            reserved: vec![files.marker.clone(), files.explanation.clone()],
        }
    }

    fn is_reserved(&self, path: &str) -> bool {
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.reserved.iter().any(|r| r == name))
    }

    /// Full cleanliness check with every reason found.
    ///
    /// Working-copy changes end the check early; otherwise every local branch
    /// is inspected so all missing upstreams are reported.
    pub fn verdict(&self, repo: &Path) -> Verdict {
        let mut verdict = Verdict::default();

        match self.git.changed_paths(repo) {
            GitOutcome::Success(paths) => {
                let changes: Vec<String> =
                    paths.into_iter().filter(|p| !self.is_reserved(p)).collect();
                if !changes.is_empty() {
                    verdict.reasons.push(DirtyReason::UncommittedChanges(changes));
                    return verdict;
                }
            }
            GitOutcome::OtherFailure(msg) => {
                verdict.reasons.push(DirtyReason::StatusFailed(msg));
                return verdict;
            }
            other => {
                verdict
                    .reasons
                    .push(DirtyReason::StatusFailed(format!("{:?}", other)));
                return verdict;
            }
        }

        let branches = match self.git.local_branches(repo) {
            GitOutcome::Success(branches) => branches,
            GitOutcome::OtherFailure(msg) => {
                verdict.reasons.push(DirtyReason::BranchListFailed(msg));
                return verdict;
            }
            other => {
                verdict
                    .reasons
                    .push(DirtyReason::BranchListFailed(format!("{:?}", other)));
                return verdict;
            }
        };

        for branch in branches {
            let reason = match self.git.upstream(repo, &branch) {
                GitOutcome::Success(upstream) => {
                    log::debug!("{}: {} tracks {}", repo.display(), branch, upstream);
                    continue;
                }
                GitOutcome::NoUpstream => DirtyReason::NoUpstream { branch },
                GitOutcome::NoCommits => DirtyReason::NoCommits { branch },
                GitOutcome::UnknownRevision => DirtyReason::UnknownRevision { branch },
                GitOutcome::OtherFailure(message) => DirtyReason::UpstreamFailed { branch, message },
            };
            verdict.reasons.push(reason);
        }

        verdict
    }
}

impl CleanlinessOracle for GitOracle {
    fn is_clean(&self, repo: &Path) -> bool {
        let verdict = self.verdict(repo);
        for reason in &verdict.reasons {
            match reason {
                DirtyReason::UncommittedChanges(_) => {
                    log::info!("{}: {}", repo.display(), reason);
                }
                _ => log::warn!("{}: {}. Assuming dirty.", repo.display(), reason),
            }
        }
        verdict.is_clean()
    }

    fn remote_url(&self, repo: &Path) -> Option<String> {
        if let Some(url) = self.git.remote_url(repo, "origin") {
            return Some(url);
        }
        match self.git.remotes(repo) {
            GitOutcome::Success(remotes) => remotes
                .iter()
                .find_map(|remote| self.git.remote_url(repo, remote)),
            _ => None,
        }
    }
}
