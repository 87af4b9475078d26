//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use trimreach_core::prelude::*;
//! ```
//!
//! Covers loading a program graph, configuring a run and picking a sink.

// Core analysis types
pub use crate::error::{TrimreachError, TrimreachResult};
pub use crate::input::ProgramGraph;

// Builder API
pub use crate::analyzer::{AnalysisReport, Analyzer};

// Search tuning
pub use crate::callgraph::SearchOptions;
pub use crate::cancel::CancellationToken;

// Reporting
pub use crate::pipeline::{ChainSink, Grouping, JsonSink, MemorySink, TextSink};

// Configuration
pub use crate::config::{load_config, TrimreachConfig};
