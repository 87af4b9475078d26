//! Override index: which methods directly override a given virtual method.
//!
//! Uses `DiGraphMap<NodeId, ()>` with base -> override edges. The relation
//! may contain cycles in malformed inputs; consumers must not assume a DAG.

use petgraph::graphmap::DiGraphMap;

use crate::index::IndexSpace;
use crate::method::{MethodId, NodeId};

/// Base-to-override relation over node indices.
#[derive(Debug, Clone, Default)]
pub struct OverrideIndex {
    graph: DiGraphMap<NodeId, ()>,
}

impl OverrideIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(base, override)` identity pairs. Pairs naming methods
    /// absent from `space` are skipped.
    pub fn from_pairs<M>(space: &IndexSpace<M>, pairs: &[(MethodId, MethodId)]) -> Self {
        let mut index = Self::new();
        let mut skipped = 0usize;
        for (base, overriding) in pairs {
            match (space.index_of(base), space.index_of(overriding)) {
                (Some(b), Some(o)) => index.add_override(b, o),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "override pairs referencing unknown methods");
        }
        index
    }

    pub fn add_override(&mut self, base: NodeId, overriding: NodeId) {
        self.graph.add_edge(base, overriding, ());
    }

    /// Direct overrides of `base`.
    pub fn overrides_of(&self, base: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .contains_node(base)
            .then(|| self.graph.neighbors(base))
            .into_iter()
            .flatten()
    }

    pub fn pair_count(&self) -> usize {
        self.graph.edge_count()
    }
}
