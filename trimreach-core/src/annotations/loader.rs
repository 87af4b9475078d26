//! Annotation configuration files.
//!
//! A configuration file is a JSON array (comments allowed) of entries:
//!
//! ```text
//! [
//!   // Type.GetType can load anything by name
//!   {
//!     "Type": "System.Type",
//!     "Methods": [ "GetType(System.String)", "GetMethod" ],
//!     "Aspect": "MemberTrimming",
//!     "Category": "Reflection",
//!     "Warn": "Loads types by name"
//!   }
//! ]
//! ```
//!
//! Exactly one of `Warn`, `Suppress` or `Safe` must be present. Malformed
//! entries fail the whole file; entries naming unknown types or methods are
//! logged and skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::annotation::{ApiAnnotation, Aspect, DEFAULT_CATEGORY};
use super::model::AnnotationModel;
use crate::error::{IoResultExt, TrimreachError, TrimreachResult};
use crate::index::IndexSpace;
use crate::method::{MethodInfo, NodeId};

/// File name suffixes picked up when scanning a directory.
pub const CONFIG_SUFFIXES: &[&str] = &[".analysisconfig.json", ".analysisconfig.jsonc"];

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "Type")]
    type_name: String,
    #[serde(rename = "Methods")]
    methods: Option<Vec<String>>,
    #[serde(rename = "Aspect")]
    aspect: Option<String>,
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "Warn")]
    warn: Option<String>,
    #[serde(rename = "Suppress")]
    suppress: Option<String>,
    #[serde(rename = "Safe")]
    safe: Option<String>,
}

/// What a configuration entry does to the methods it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationAction {
    Warn(String),
    Suppress(String),
    /// Marks matched methods trim-friendly; the search stops at them.
    Safe(String),
}

/// One validated configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEntry {
    pub type_name: String,
    pub methods: Vec<String>,
    pub aspect: Aspect,
    pub category: String,
    pub action: AnnotationAction,
    /// File the entry came from, for diagnostics
    pub source: PathBuf,
}

impl AnnotationEntry {
    fn annotation(&self) -> Option<ApiAnnotation> {
        match &self.action {
            AnnotationAction::Warn(message) => {
                Some(ApiAnnotation::warn(&self.category, message, self.aspect))
            }
            AnnotationAction::Suppress(reason) => {
                Some(ApiAnnotation::suppress(&self.category, reason, self.aspect))
            }
            AnnotationAction::Safe(_) => None,
        }
    }
}

impl RawEntry {
    fn validate(self, path: &Path) -> TrimreachResult<AnnotationEntry> {
        let type_name = self.type_name;
        let fail = |message: String| TrimreachError::config(path, message);

        let mut actions = Vec::with_capacity(1);
        if let Some(m) = self.warn {
            actions.push(AnnotationAction::Warn(m));
        }
        if let Some(r) = self.suppress {
            actions.push(AnnotationAction::Suppress(r));
        }
        if let Some(r) = self.safe {
            actions.push(AnnotationAction::Safe(r));
        }
        if actions.len() > 1 {
            return Err(fail(format!(
                "annotation for '{}' specifies more than one of 'Warn', 'Suppress' and 'Safe'",
                type_name
            )));
        }
        let action = actions.pop().ok_or_else(|| {
            fail(format!(
                "annotation for '{}' doesn't specify any action property ('Warn', 'Suppress' or 'Safe')",
                type_name
            ))
        })?;

        let methods = self.methods.ok_or_else(|| {
            fail(format!(
                "annotation for type '{}' doesn't specify 'Methods' property",
                type_name
            ))
        })?;

        let aspect = self
            .aspect
            .ok_or_else(|| {
                fail(format!(
                    "annotation for type '{}' doesn't specify 'Aspect' property",
                    type_name
                ))
            })?
            .parse::<Aspect>()
            .map_err(|e| fail(format!("annotation for type '{}': {}", type_name, e)))?;

        Ok(AnnotationEntry {
            type_name,
            methods,
            aspect,
            category: self.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            action,
            source: path.to_path_buf(),
        })
    }
}

/// Removes `//` line comments and `/* */` block comments outside strings.
pub fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Parses and validates one configuration document.
pub fn parse_annotation_config(path: &Path, text: &str) -> TrimreachResult<Vec<AnnotationEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(&strip_json_comments(text))
        .map_err(|e| TrimreachError::config(path, format!("invalid JSON: {}", e)))?;
    raw.into_iter().map(|entry| entry.validate(path)).collect()
}

pub fn load_annotation_file(path: &Path) -> TrimreachResult<Vec<AnnotationEntry>> {
    let text = fs::read_to_string(path).with_path(path)?;
    let entries = parse_annotation_config(path, &text)?;
    debug!(path = %path.display(), entries = entries.len(), "loaded annotation configuration");
    Ok(entries)
}

fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| CONFIG_SUFFIXES.iter().any(|s| n.ends_with(s)))
        .unwrap_or(false)
}

/// Expands files and directories into a sorted list of configuration files.
/// Explicitly named files are taken as-is regardless of suffix.
pub fn gather_annotation_files(paths: &[PathBuf]) -> TrimreachResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.map_err(|e| {
                    TrimreachError::config(path, format!("cannot scan directory: {}", e))
                })?;
                if entry.file_type().is_file() && is_config_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(TrimreachError::config(path, "annotation path does not exist"));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Loads every configuration file under `paths`, in sorted order.
pub fn load_annotation_paths(paths: &[PathBuf]) -> TrimreachResult<Vec<AnnotationEntry>> {
    let mut entries = Vec::new();
    for file in gather_annotation_files(paths)? {
        entries.extend(load_annotation_file(&file)?);
    }
    Ok(entries)
}

/// Declaring-type lookup over resolved methods.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    by_type: HashMap<String, Vec<NodeId>>,
}

impl TypeCatalog {
    pub fn build(space: &IndexSpace<MethodInfo>) -> Self {
        let mut by_type: HashMap<String, Vec<NodeId>> = HashMap::new();
        for (node, method) in space.iter() {
            by_type
                .entry(method.declaring_type.clone())
                .or_default()
                .push(node);
        }
        Self { by_type }
    }

    pub fn methods_of(&self, type_name: &str) -> Option<&[NodeId]> {
        self.by_type.get(type_name).map(Vec::as_slice)
    }

    pub fn type_count(&self) -> usize {
        self.by_type.len()
    }
}

/// `*` matches everything, a bare name matches by simple name, and a
/// parenthesized form must equal the full signature.
pub fn matches_method_name(pattern: &str, method: &MethodInfo) -> bool {
    if pattern == "*" {
        true
    } else if !pattern.contains('(') {
        pattern == method.name
    } else {
        pattern == method.signature
    }
}

/// Counters from applying configuration entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    pub annotated: usize,
    pub safe: usize,
    pub duplicates: usize,
    pub unresolved_types: usize,
    pub unresolved_methods: usize,
}

/// Attaches entries to matching methods in `model`.
pub fn apply_entries(
    entries: &[AnnotationEntry],
    space: &IndexSpace<MethodInfo>,
    model: &mut AnnotationModel,
) -> ApplyStats {
    let catalog = TypeCatalog::build(space);
    let mut stats = ApplyStats::default();

    for entry in entries {
        let Some(candidates) = catalog.methods_of(&entry.type_name) else {
            warn!(
                type_name = %entry.type_name,
                file = %entry.source.display(),
                "could not resolve type name in annotation configuration, ignoring entry"
            );
            stats.unresolved_types += 1;
            continue;
        };

        for pattern in &entry.methods {
            let mut found = false;
            for &node in candidates {
                let Some(method) = space.method_of(node) else {
                    continue;
                };
                if !matches_method_name(pattern, method) {
                    continue;
                }
                found = true;
                match entry.annotation() {
                    Some(annotation) => {
                        if model.annotate(node, annotation) {
                            stats.annotated += 1;
                        } else {
                            stats.duplicates += 1;
                        }
                    }
                    None => {
                        model.mark_safe(node);
                        stats.safe += 1;
                    }
                }
            }
            if !found {
                warn!(
                    type_name = %entry.type_name,
                    method = %pattern,
                    file = %entry.source.display(),
                    "annotation names a method which can't be resolved"
                );
                stats.unresolved_methods += 1;
            }
        }
    }

    info!(
        entries = entries.len(),
        annotated = stats.annotated,
        safe = stats.safe,
        unresolved_types = stats.unresolved_types,
        unresolved_methods = stats.unresolved_methods,
        "applied annotation configuration"
    );
    stats
}
