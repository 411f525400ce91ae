//! Heuristics configuration loaded from heuristics.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

// Embed the TOML file directly in the binary at compile time
const HEURISTICS_TOML: &str = include_str!("../heuristics.toml");

/// Names of the files this tool writes.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservedFiles {
    pub marker: String,
    pub explanation: String,
}

/// Locations that are never enumerated.
#[derive(Debug, Clone, Deserialize)]
pub struct SkipConfig {
    pub patterns: Vec<String>,
}

/// Build-output heuristics.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    pub output_dirs: Vec<String>,
    pub gradle_files: Vec<String>,
    pub target_manifests: Vec<String>,
}

/// Extra work done when the walk starts at a home directory.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    /// Paths relative to the home directory
    pub package_caches: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub files: ReservedFiles,
    pub skip: SkipConfig,
    pub build: BuildConfig,
    pub home: HomeConfig,
}

impl Config {
    /// The heuristics compiled into the binary.
    pub fn embedded() -> Result<Self> {
        let table = parse_table(HEURISTICS_TOML).context("Failed to parse embedded heuristics")?;
        into_config(table)
    }

    /// Load the embedded heuristics, with `override_path` merged on top when given.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut table =
            parse_table(HEURISTICS_TOML).context("Failed to parse embedded heuristics")?;

        if let Some(path) = override_path {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let overrides = parse_table(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            merge_tables(&mut table, overrides);
        }

        into_config(table)
    }
}

fn parse_table(text: &str) -> Result<toml::Table> {
    Ok(toml::from_str(text)?)
}

fn into_config(table: toml::Table) -> Result<Config> {
    toml::Value::Table(table)
        .try_into()
        .context("Invalid heuristics configuration")
}

/// Recursively merge `overrides` into `base`. Nested tables merge; any other
/// value replaces the base value outright.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
