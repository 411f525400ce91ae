//! Writing, finding and removing the marker and explanation files.

use crate::config::ReservedFiles;
use crate::patterns::Heuristics;

use ignore::WalkBuilder;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkError {
    #[error("failed to write marker {path}: {source}")]
    Marker { path: PathBuf, source: io::Error },

    #[error("failed to append explanation to {path}: {source}")]
    Explanation { path: PathBuf, source: io::Error },
}

/// Create the zero-byte marker inside `dir`. An existing file is left as is.
pub fn write_marker(dir: &Path, files: &ReservedFiles) -> Result<PathBuf, MarkError> {
    let path = dir.join(&files.marker);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| MarkError::Marker {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// The text block recorded for an excluded clean repository.
pub fn explanation_text(repo: &Path, remote_url: Option<&str>) -> String {
    let name = repo
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "This directory - {} - is a clean git repository with no unpushed commits.\n\
         We can safely ignore it during backup. To restore, use git clone or fetch.\n\
         To clone: git clone {} {}\n\n",
        repo.display(),
        remote_url.unwrap_or("<no remote configured>"),
        name
    )
}

/// Append the explanation for `repo` to the explanation file in `parent`.
///
/// The parent must already exist; it is never created.
pub fn append_explanation(
    parent: &Path,
    repo: &Path,
    remote_url: Option<&str>,
    files: &ReservedFiles,
) -> Result<PathBuf, MarkError> {
    let path = parent.join(&files.explanation);
    let text = explanation_text(repo, remote_url);

    OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .and_then(|mut file| file.write_all(text.as_bytes()))
        .map_err(|source| MarkError::Explanation {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}

/// Marker and explanation files found under a root.
#[derive(Debug, Default)]
pub struct WrittenFiles {
    pub markers: Vec<PathBuf>,
    pub explanations: Vec<PathBuf>,
}

/// Find every marker and explanation file under `root`.
///
/// Skip-listed directories are not entered, and neither is any directory
/// holding a marker: its marker is recorded and the walk moves on.
pub fn find_written(root: &Path, files: &ReservedFiles, heuristics: &Heuristics) -> WrittenFiles {
    let marked_dirs = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let marked_dirs_clone = Arc::clone(&marked_dirs);
    let heuristics = heuristics.clone();
    let marker_name = files.marker.clone();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            let path = entry.path();
            if heuristics.is_skipped(path) {
                return false;
            }
            let marker = path.join(&marker_name);
            if marker.is_file() {
                if let Ok(mut dirs) = marked_dirs_clone.lock() {
                    dirs.push(marker);
                }
                return false;
            }
            true
        })
        .build();

    let mut written = WrittenFiles::default();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("Failed to access entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == files.marker.as_str() {
            written.markers.push(entry.path().to_path_buf());
        } else if name == files.explanation.as_str() {
            written.explanations.push(entry.path().to_path_buf());
        }
    }

    if let Ok(mut dirs) = marked_dirs.lock() {
        written.markers.append(&mut dirs);
    }
    written.markers.sort();
    written.explanations.sort();
    written
}

/// Delete every marker and explanation file under `root`. Returns how many were removed.
pub fn remove_written(root: &Path, files: &ReservedFiles, heuristics: &Heuristics) -> usize {
    let written = find_written(root, files, heuristics);
    let mut removed = 0;

    for path in written.markers.iter().chain(&written.explanations) {
        match fs::remove_file(path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(err) => log::warn!("Failed to remove {}: {}", path.display(), err),
        }
    }

    removed
}

/// Delete the markers directly inside `home.join(cache)` for each of `caches`.
///
/// Package caches sit under skip-listed directories that [`remove_written`]
/// never enters, so their markers are cleared by location instead.
pub fn remove_cache_markers(home: &Path, caches: &[PathBuf], files: &ReservedFiles) -> usize {
    let mut removed = 0;

    for cache in caches {
        let path = home.join(cache).join(&files.marker);
        if !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                removed += 1;
            }
            Err(err) => log::warn!("Failed to remove {}: {}", path.display(), err),
        }
    }

    removed
}
