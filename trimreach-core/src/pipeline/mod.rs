//! Result pipeline: search workers produce, one consumer reports.
//!
//! # Architecture
//!
//! ```text
//!  rayon workers                 crossbeam channel            consumer thread
//! ┌──────────────┐
//! │ search(src)  │──Found(paths)──┐
//! ├──────────────┤                │    ┌──────────────┐      ┌────────────────┐
//! │ search(src)  │──Found(paths)──┼───▶│  unbounded   │─────▶│ ResultPipeline │──▶ ChainSink
//! ├──────────────┤                │    └──────────────┘      │ classify       │
//! │     ...      │──Found(paths)──┘           ▲              │ dedup          │
//! └──────────────┘                            │              │ aggregate      │
//!        all searches done ─────────── Done ──┘              └────────────────┘
//! ```
//!
//! The consumer exits only on `Done`, which is sent after every producer
//! has returned, so no finding can be lost at shutdown.
//!
//! # Performance Characteristics
//!
//! - Producers send node paths, not predecessor arrays: O(path length)
//!   per destination on the queue.
//! - Ungrouped runs stream each chain; grouped runs buffer all distinct
//!   chains until the queue is drained.

pub mod chain;
pub mod classify;
pub mod grouping;
pub mod sink;
pub mod worker;

pub use chain::{ChainKey, PipelineMessage, RawFinding, ReportedChain};
pub use classify::{CategoryRule, ChainClassifier, DEFAULT_RULES, RESOLUTION_FAILURE};
pub use grouping::{node_label, GroupKind, Grouping};
pub use sink::{ChainSink, JsonSink, MemorySink, TextSink};
pub use worker::{GroupCount, PipelineSummary, ResultPipeline};
