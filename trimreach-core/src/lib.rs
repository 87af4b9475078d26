//! trimreach-core: trimming-readiness reachability analysis.
//!
//! Given a whole-program method call graph and annotations marking some
//! methods dangerous to trim (or safe), finds every shortest call chain from
//! a dangerous method up to a public or overridable entry method.
//!
//! # Features
//!
//! - **Compact call graph**: dense integer ids, flat caller lists and flags
//! - **Constrained bottom-up search**: stops at entries, virtual and safe
//!   methods, and statically resolved reflective calls
//! - **Override propagation**: Warn annotations flow to every override
//! - **Concurrent reporting**: parallel searches, one consumer, streamed or
//!   grouped output as text or JSON
//! - **Coverage summary**: hit types per namespace
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use trimreach_core::prelude::*;
//!
//! let program = ProgramGraph::load(std::path::Path::new("graph.json"))?;
//! let report = Analyzer::new(&program)
//!     .annotation_files(["annotations/"])
//!     .run(TextSink::new(std::io::stdout()))?;
//!
//! for line in report.summary_lines() {
//!     eprintln!("{}", line);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`input`]: program graph interchange format
//! - [`index`]: method identity to dense index mapping
//! - [`annotations`]: annotation kinds, configuration files, propagation
//! - [`reflection`]: reflection scanner verdicts
//! - [`callgraph`]: compact graph and reachability search
//! - [`pipeline`]: producer/consumer result stage and report sinks
//! - [`coverage`]: namespace coverage summary
//! - [`analyzer`]: fluent builder running every phase
//! - [`error`]: typed error handling

pub mod analyzer;
pub mod annotations;
pub mod callgraph;
pub mod cancel;
pub mod config;
pub mod coverage;
pub mod error;
pub mod index;
pub mod input;
pub mod logging;
pub mod method;
pub mod overrides;
pub mod pipeline;
pub mod prelude;
pub mod reflection;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{IoResultExt, TrimreachError, TrimreachResult};

// Builder API
pub use analyzer::{AnalysisReport, Analyzer, PreparedAnalysis};

// Configuration
pub use config::{load_config, load_config_file, ReportConfig, SearchConfig, TrimreachConfig};

// Logging
pub use logging::{init_structured_logging, log_error, log_info, log_warn};

// Methods and indexing
pub use index::IndexSpace;
pub use input::{ProgramGraph, RecognizedCall, ReflectionInput, UnrecognizedCall};
pub use method::{MethodId, MethodInfo, NodeId};

// Annotations
pub use annotations::{
    apply_entries, load_annotation_paths, parse_annotation_config, AnnotationAction,
    AnnotationEntry, AnnotationModel, ApiAnnotation, Aspect, NodeClass, PropagationStats,
    UnanalyzedCall,
};
pub use overrides::OverrideIndex;
pub use reflection::ReflectionVerdicts;

// Graph and search
pub use callgraph::{
    CallGraphStats, CompactCallGraph, NodeFlags, ReachabilitySearch, SearchOptions, SearchResult,
    DEFAULT_MAX_DESTINATIONS,
};
pub use cancel::CancellationToken;

// Pipeline and reporting
pub use coverage::{CoverageSummary, NamespaceCoverage};
pub use pipeline::{
    ChainSink, Grouping, JsonSink, MemorySink, PipelineSummary, ReportedChain, ResultPipeline,
    TextSink,
};

#[cfg(test)]
mod tests;
