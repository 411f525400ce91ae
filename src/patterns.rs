//! Name-based heuristics: the skip list and build-output detection.

use crate::config::Config;
use std::path::{Component, Path};

/// Why a directory was classified as recreatable build output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    /// Conventional output name such as `bin`, `obj` or `dist`
    Output,
    /// `build` next to a Gradle project file
    Gradle,
    /// `target` next to a Maven or Cargo manifest
    Target,
}

/// Compiled view of the name-based parts of [`Config`].
#[derive(Debug, Clone)]
pub struct Heuristics {
    skip_patterns: Vec<String>,
    output_dirs: Vec<String>,
    gradle_files: Vec<String>,
    target_manifests: Vec<String>,
}

impl Heuristics {
    pub fn new(config: &Config) -> Self {
        Self {
            skip_patterns: config.skip.patterns.clone(),
            output_dirs: config.build.output_dirs.clone(),
            gradle_files: config.build.gradle_files.clone(),
            target_manifests: config.build.target_manifests.clone(),
        }
    }

    /// True when the walk must not enumerate `path` at all.
    pub fn is_skipped(&self, path: &Path) -> bool {
        self.skip_patterns
            .iter()
            .any(|pattern| matches_path_suffix(path, pattern))
    }

    /// True when `name` is a conventional build-output directory name.
    pub fn is_output_dir(&self, name: &str) -> bool {
        self.output_dirs.iter().any(|d| d == name)
    }

    /// Classify `child` (a directory inside `parent`) as build output, if it is.
    ///
    /// The Gradle and Maven/Cargo checks look at sibling files in `parent`,
    /// so the child's own contents are never read.
    pub fn build_kind(&self, parent: &Path, child: &Path) -> Option<BuildKind> {
        let name = child.file_name().and_then(|n| n.to_str())?;

        if self.is_output_dir(name) {
            return Some(BuildKind::Output);
        }

        match name {
            "build" if has_any_file(parent, &self.gradle_files) => Some(BuildKind::Gradle),
            "target" if has_any_file(parent, &self.target_manifests) => Some(BuildKind::Target),
            _ => None,
        }
    }
}

fn has_any_file(dir: &Path, names: &[String]) -> bool {
    names.iter().any(|name| dir.join(name).is_file())
}

/// Helper function to match multi-component patterns against path suffixes
/// Supports wildcards like ".var/app/*" and literals like ".local/share"
pub fn matches_path_suffix(path: &Path, pattern: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty()).collect();
    if pattern_parts.is_empty() {
        return false;
    }

    let path_components: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(os_str) => Some(os_str.to_string_lossy()),
            _ => None,
        })
        .collect();

    if path_components.len() < pattern_parts.len() {
        return false;
    }

    // Match from the end of the path
    let start_idx = path_components.len() - pattern_parts.len();
    pattern_parts
        .iter()
        .enumerate()
        .all(|(i, part)| matches_component(&path_components[start_idx + i], part))
}

/// Match a single path component against a pattern with at most one `*`
fn matches_component(component: &str, pattern: &str) -> bool {
    if pattern == component {
        return true;
    }

    if !pattern.contains('*') {
        return false;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 2 {
        return component.len() >= parts[0].len() + parts[1].len()
            && component.starts_with(parts[0])
            && component.ends_with(parts[1]);
    }

    // More than one wildcard is not supported
    false
}
