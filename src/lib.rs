//! skipmark - Backup Exclusion Marker
//!
//! skipmark walks a directory tree and drops `.deja-dup-ignore` markers into
//! directories that a backup does not need:
//!
//! - git working copies with no uncommitted changes whose local branches all
//!   track an upstream (they can be cloned again), and
//! - build output recreatable from a project manifest (`bin`, `obj`, `dist`,
//!   Gradle `build`, Maven/Cargo `target`).
//!
//! Every clean repository also gets an explanation block, with the command
//! to clone it again, appended to `git_backup_ignore_explanations.txt` in
//! its parent directory.

pub mod config;
pub mod marker;
pub mod patterns;
pub mod vcs;
pub mod walker;

// Re-export commonly used items
pub use config::Config;
pub use marker::{
    find_written, remove_cache_markers, remove_written, MarkError, WrittenFiles,
};
pub use patterns::{BuildKind, Heuristics};
pub use vcs::{CleanlinessOracle, DirtyReason, GitOracle, GitOutcome, Verdict};
pub use walker::{Exclusion, ExclusionReason, WalkSummary, Walker};
