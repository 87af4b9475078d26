//! Integer-indexed call graph and the reachability search over it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │      graph.rs       │     │      search.rs      │
//! │  ─────────────────  │     │  ─────────────────  │
//! │  caller lists       │────▶│  bottom-up BFS per  │
//! │  flag arrays        │     │  interesting node   │
//! │  safe edges         │     │  predecessor trees  │
//! └─────────────────────┘     └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use trimreach_core::callgraph::{CompactCallGraph, NodeFlags, ReachabilitySearch, SearchOptions};
//!
//! let mut flags = NodeFlags::new(3);
//! flags.is_entry[0] = true;
//! flags.is_interesting[2] = true;
//! let graph = CompactCallGraph::build(3, &[(0, 1), (1, 2)], flags, Vec::new());
//!
//! let result = ReachabilitySearch::new(&graph, SearchOptions::default()).search(2);
//! assert_eq!(result.path_to(0), Some(vec![2, 1, 0]));
//! ```

pub mod graph;
pub mod search;

pub use graph::{CallGraphStats, CompactCallGraph, NodeFlags};
pub use search::{
    ReachabilitySearch, SearchOptions, SearchResult, DEFAULT_MAX_DESTINATIONS, UNREACHED,
};
