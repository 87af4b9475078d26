//! Annotations: which methods are interesting, which are safe.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────────┐
//! │    loader.rs     │   │  reflection.rs   │   │      model.rs        │
//! │ *.analysisconfig │──▶│ unrecognized     │──▶│ per-node annotation  │
//! │ Warn/Suppress/   │   │ call sites       │   │ safe flags           │
//! │ Safe entries     │   │                  │   │ override propagation │
//! └──────────────────┘   └──────────────────┘   └──────────────────────┘
//! ```
//!
//! Configured annotations are applied first, so a configured Warn or
//! Suppress always takes precedence over an Unanalyzed record for the same
//! method. Propagation runs last.

pub mod annotation;
pub mod loader;
pub mod model;

pub use annotation::{ApiAnnotation, Aspect, UnanalyzedCall, DEFAULT_CATEGORY, UNANALYZED_CATEGORY};
pub use loader::{
    apply_entries, gather_annotation_files, load_annotation_file, load_annotation_paths,
    matches_method_name, parse_annotation_config, strip_json_comments, AnnotationAction,
    AnnotationEntry, ApplyStats, TypeCatalog,
};
pub use model::{AnnotationModel, NodeClass, PropagationStats};
