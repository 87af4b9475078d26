//! Compact, integer-indexed call graph.
//!
//! Every per-node fact lives in a flat array indexed by [`NodeId`]:
//! - `callers[i]`: deduplicated caller indices (the graph is walked bottom-up)
//! - `safe_edges[i]`: callers whose call into `i` was statically resolved
//! - four boolean flag arrays (entry, interesting, safe, virtual)
//!
//! # Performance Characteristics
//!
//! - Build: O(|V| + |E| log d) where d is the largest caller fan-in
//! - Lookups: O(1) flag reads, O(log d) safe-edge checks on sorted lists

use serde::Serialize;

use crate::method::NodeId;

/// Per-node boolean classification consumed by the search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub is_entry: Vec<bool>,
    pub is_interesting: Vec<bool>,
    pub is_safe: Vec<bool>,
    pub is_virtual: Vec<bool>,
}

impl NodeFlags {
    /// All-false flags for `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            is_entry: vec![false; node_count],
            is_interesting: vec![false; node_count],
            is_safe: vec![false; node_count],
            is_virtual: vec![false; node_count],
        }
    }

    fn resize(&mut self, node_count: usize) {
        self.is_entry.resize(node_count, false);
        self.is_interesting.resize(node_count, false);
        self.is_safe.resize(node_count, false);
        self.is_virtual.resize(node_count, false);
    }
}

/// Statistics about the compact graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallGraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub entry_count: usize,
    pub interesting_count: usize,
    pub safe_count: usize,
    pub virtual_count: usize,
}

/// Call graph stored as callee-indexed caller lists plus flag arrays.
#[derive(Debug, Clone)]
pub struct CompactCallGraph {
    callers: Vec<Vec<NodeId>>,
    safe_edges: Vec<Vec<NodeId>>,
    flags: NodeFlags,
    edge_count: usize,
}

impl CompactCallGraph {
    /// Build the graph from `(caller, callee)` pairs.
    ///
    /// Pairs naming an index outside `0..node_count` are dropped. Caller
    /// lists are sorted and deduplicated, so building twice from the same
    /// logical input yields identical arrays.
    pub fn build(
        node_count: usize,
        edges: &[(NodeId, NodeId)],
        mut flags: NodeFlags,
        mut safe_edges: Vec<Vec<NodeId>>,
    ) -> Self {
        let mut callers: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
        let mut dropped = 0usize;

        for &(caller, callee) in edges {
            if (caller as usize) < node_count && (callee as usize) < node_count {
                callers[callee as usize].push(caller);
            } else {
                dropped += 1;
            }
        }

        let mut edge_count = 0;
        for list in &mut callers {
            list.sort_unstable();
            list.dedup();
            edge_count += list.len();
        }

        if dropped > 0 {
            tracing::debug!(dropped, "skipped edges referencing unknown nodes");
        }

        flags.resize(node_count);
        safe_edges.resize(node_count, Vec::new());
        for list in &mut safe_edges {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            callers,
            safe_edges,
            flags,
            edge_count,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.callers.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Callers of `node`, sorted ascending.
    #[inline]
    pub fn callers(&self, node: NodeId) -> &[NodeId] {
        &self.callers[node as usize]
    }

    /// Callers whose call into `node` is known safe.
    #[inline]
    pub fn safe_edges(&self, node: NodeId) -> &[NodeId] {
        &self.safe_edges[node as usize]
    }

    /// True when the bottom-up edge `callee -> caller` must be ignored.
    #[inline]
    pub fn is_safe_edge(&self, callee: NodeId, caller: NodeId) -> bool {
        self.safe_edges[callee as usize].binary_search(&caller).is_ok()
    }

    #[inline]
    pub fn is_entry(&self, node: NodeId) -> bool {
        self.flags.is_entry[node as usize]
    }

    #[inline]
    pub fn is_interesting(&self, node: NodeId) -> bool {
        self.flags.is_interesting[node as usize]
    }

    #[inline]
    pub fn is_safe(&self, node: NodeId) -> bool {
        self.flags.is_safe[node as usize]
    }

    #[inline]
    pub fn is_virtual(&self, node: NodeId) -> bool {
        self.flags.is_virtual[node as usize]
    }

    pub fn flags(&self) -> &NodeFlags {
        &self.flags
    }

    /// Every node flagged interesting, ascending.
    pub fn interesting_nodes(&self) -> Vec<NodeId> {
        self.flags
            .is_interesting
            .iter()
            .enumerate()
            .filter(|(_, &interesting)| interesting)
            .map(|(i, _)| i as NodeId)
            .collect()
    }

    pub fn stats(&self) -> CallGraphStats {
        let count = |v: &[bool]| v.iter().filter(|&&b| b).count();
        CallGraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count,
            entry_count: count(&self.flags.is_entry),
            interesting_count: count(&self.flags.is_interesting),
            safe_count: count(&self.flags.is_safe),
            virtual_count: count(&self.flags.is_virtual),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callers_are_indexed_by_callee() {
        // 0 calls 1, 2 calls 1
        let g = CompactCallGraph::build(3, &[(0, 1), (2, 1)], NodeFlags::new(3), Vec::new());
        assert_eq!(g.callers(1), &[0, 2]);
        assert!(g.callers(0).is_empty());
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let g = CompactCallGraph::build(
            2,
            &[(0, 1), (0, 1), (0, 1)],
            NodeFlags::new(2),
            Vec::new(),
        );
        assert_eq!(g.callers(1), &[0]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_build_is_idempotent() {
        let edges = [(3, 0), (1, 0), (2, 1), (1, 0), (0, 2)];
        let a = CompactCallGraph::build(4, &edges, NodeFlags::new(4), vec![vec![3, 1]]);
        let mut reversed = edges;
        reversed.reverse();
        let b = CompactCallGraph::build(4, &reversed, NodeFlags::new(4), vec![vec![1, 3]]);

        for node in 0..4 {
            assert_eq!(a.callers(node), b.callers(node));
            assert_eq!(a.safe_edges(node), b.safe_edges(node));
        }
        assert_eq!(a.edge_count(), b.edge_count());
    }

    #[test]
    fn test_out_of_range_edges_dropped() {
        let g = CompactCallGraph::build(2, &[(0, 1), (0, 7), (9, 1)], NodeFlags::new(2), Vec::new());
        assert_eq!(g.callers(1), &[0]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_short_flag_arrays_are_padded() {
        let mut flags = NodeFlags::new(1);
        flags.is_entry[0] = true;
        let g = CompactCallGraph::build(3, &[], flags, Vec::new());
        assert!(g.is_entry(0));
        assert!(!g.is_entry(2));
        assert!(g.safe_edges(2).is_empty());
    }

    #[test]
    fn test_safe_edge_lookup() {
        let g = CompactCallGraph::build(
            3,
            &[(1, 0), (2, 0)],
            NodeFlags::new(3),
            vec![vec![2]],
        );
        assert!(g.is_safe_edge(0, 2));
        assert!(!g.is_safe_edge(0, 1));
    }

    #[test]
    fn test_stats_and_interesting_nodes() {
        let mut flags = NodeFlags::new(4);
        flags.is_interesting[1] = true;
        flags.is_interesting[3] = true;
        flags.is_entry[0] = true;
        flags.is_virtual[0] = true;
        let g = CompactCallGraph::build(4, &[(0, 1)], flags, Vec::new());

        assert_eq!(g.interesting_nodes(), vec![1, 3]);
        let stats = g.stats();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.interesting_count, 2);
        assert_eq!(stats.virtual_count, 1);
        assert_eq!(stats.safe_count, 0);
    }
}
