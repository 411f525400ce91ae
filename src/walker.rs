//! Depth-first classification walk that marks excludable directories.

use crate::config::{Config, ReservedFiles};
use crate::marker::{append_explanation, write_marker};
use crate::patterns::{BuildKind, Heuristics};
use crate::vcs::{has_vcs_marker, CleanlinessOracle};

use indicatif::ProgressBar;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a directory received a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Clean git checkout whose branches all track an upstream
    CleanRepository,
    /// Recreatable build output
    BuildOutput(BuildKind),
    /// Well-known package manager cache under the home directory
    PackageCache,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CleanRepository => write!(f, "clean git repository"),
            Self::BuildOutput(BuildKind::Output) => write!(f, "build output"),
            Self::BuildOutput(BuildKind::Gradle) => write!(f, "gradle build"),
            Self::BuildOutput(BuildKind::Target) => write!(f, "maven/cargo target"),
            Self::PackageCache => write!(f, "package cache"),
        }
    }
}

/// A directory that was marked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub path: PathBuf,
    pub reason: ExclusionReason,
}

/// What a walk did.
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Directories whose entries were listed
    pub visited: usize,
    /// Directories left alone because of the skip list
    pub skipped: usize,
    /// Directories that could not be listed
    pub unreadable: usize,
    /// Working copies handed to the oracle
    pub repositories: usize,
    /// Exclusions abandoned because a file could not be written
    pub failed_writes: usize,
    pub exclusions: Vec<Exclusion>,
}

enum Decision {
    Descend,
    Stop,
}

/// Walks a tree and writes markers for directories that need no backup.
pub struct Walker<'a> {
    oracle: &'a dyn CleanlinessOracle,
    heuristics: Heuristics,
    files: ReservedFiles,
    package_caches: Vec<PathBuf>,
    progress: ProgressBar,
}

impl<'a> Walker<'a> {
    pub fn new(oracle: &'a dyn CleanlinessOracle, config: &Config) -> Self {
        Self {
            oracle,
            heuristics: Heuristics::new(config),
            files: config.files.clone(),
            package_caches: config.home.package_caches.clone(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report the directory being listed on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Classify every directory below `root`. `root` itself is only listed, never marked.
    pub fn walk(&self, root: &Path) -> WalkSummary {
        let mut summary = WalkSummary::default();
        self.visit(root, &mut summary);
        summary
    }

    /// Mark the configured package caches under `home`, whatever they contain.
    pub fn mark_package_caches(&self, home: &Path) -> Vec<Exclusion> {
        let mut exclusions = Vec::new();

        for cache in &self.package_caches {
            let path = home.join(cache);
            if !path.is_dir() {
                continue;
            }
            match write_marker(&path, &self.files) {
                Ok(_) => {
                    log::info!("Marked package cache {}", path.display());
                    exclusions.push(Exclusion {
                        path,
                        reason: ExclusionReason::PackageCache,
                    });
                }
                Err(err) => log::warn!("{}", err),
            }
        }

        exclusions
    }

    fn visit(&self, dir: &Path, summary: &mut WalkSummary) {
        self.progress.set_message(dir.display().to_string());

        // Permission errors and races with deletion leave the directory looking empty
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!("Cannot list {}: {}", dir.display(), err);
                summary.unreadable += 1;
                return;
            }
        };
        summary.visited += 1;

        // DirEntry::file_type does not follow symlinks
        let mut children: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_type().is_ok_and(|ft| ft.is_dir()))
            .map(|e| e.path())
            .collect();
        children.sort();

        for child in children {
            if self.heuristics.is_skipped(&child) {
                log::debug!("Skipping {}", child.display());
                summary.skipped += 1;
                continue;
            }

            log::debug!("{} -> {}", dir.display(), child.display());
            match self.classify(dir, &child, summary) {
                Decision::Descend => self.visit(&child, summary),
                Decision::Stop => {}
            }
        }
    }

    fn classify(&self, parent: &Path, child: &Path, summary: &mut WalkSummary) -> Decision {
        if has_vcs_marker(child) {
            summary.repositories += 1;
            if self.oracle.is_clean(child) {
                self.exclude_clean_repository(parent, child, summary);
                return Decision::Stop;
            }
            log::debug!("{} must be backed up", child.display());
        }

        if let Some(kind) = self.heuristics.build_kind(parent, child) {
            self.exclude(child, ExclusionReason::BuildOutput(kind), summary);
            return Decision::Stop;
        }

        Decision::Descend
    }

    fn exclude_clean_repository(&self, parent: &Path, repo: &Path, summary: &mut WalkSummary) {
        let url = self.oracle.remote_url(repo);

        // Without its explanation the repository stays unmarked until the next run
        if let Err(err) = append_explanation(parent, repo, url.as_deref(), &self.files) {
            log::warn!("{}", err);
            summary.failed_writes += 1;
            return;
        }

        self.exclude(repo, ExclusionReason::CleanRepository, summary);
    }

    fn exclude(&self, dir: &Path, reason: ExclusionReason, summary: &mut WalkSummary) {
        match write_marker(dir, &self.files) {
            Ok(_) => {
                log::info!("Excluding {} ({})", dir.display(), reason);
                summary.exclusions.push(Exclusion {
                    path: dir.to_path_buf(),
                    reason,
                });
            }
            Err(err) => {
                log::warn!("{}", err);
                summary.failed_writes += 1;
            }
        }
    }
}
