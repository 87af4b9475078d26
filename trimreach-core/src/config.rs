//! Configuration loading from trimreach.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs, path::Path};

use crate::callgraph::{SearchOptions, DEFAULT_MAX_DESTINATIONS};

/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE_NAME: &str = "trimreach.toml";

/// Main configuration structure for trimreach.toml.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct TrimreachConfig {
    /// Annotation configuration files or directories.
    pub annotations: Option<Vec<PathBuf>>,
    /// Search limits.
    pub search: Option<SearchConfig>,
    /// Report layout.
    pub report: Option<ReportConfig>,
}

/// `[search]` section.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Destinations collected per search; 0 means unlimited.
    pub max_destinations: Option<usize>,
    /// Stop each search at its first destination.
    pub first_only: Option<bool>,
    /// Do not search through other interesting methods.
    pub exclude_interior_sources: Option<bool>,
}

/// `[report]` section.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// `none`, `caller`, `immediate-caller` or `callee`.
    pub grouping: Option<String>,
    /// `text` or `json`.
    pub format: Option<String>,
}

impl SearchConfig {
    pub fn to_options(&self) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            max_destinations: match self.max_destinations {
                Some(0) => None,
                Some(n) => Some(n),
                None => Some(DEFAULT_MAX_DESTINATIONS),
            },
            return_multiple: !self.first_only.unwrap_or(false),
            exclude_interior_sources: self
                .exclude_interior_sources
                .unwrap_or(defaults.exclude_interior_sources),
        }
    }
}

impl TrimreachConfig {
    /// Annotation paths, resolved relative to `base` when not absolute.
    pub fn annotation_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.annotations
            .iter()
            .flatten()
            .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
            .collect()
    }
}

/// Loads configuration from trimreach.toml in `dir` if it exists.
pub fn load_config(dir: &Path) -> Result<Option<TrimreachConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads an explicitly named configuration file.
pub fn load_config_file(path: &Path) -> Result<TrimreachConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))
}
