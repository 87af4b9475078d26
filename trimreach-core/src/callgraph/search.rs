//! Constrained bottom-up breadth-first search.
//!
//! Each search starts at one interesting node and walks `callers[]` until it
//! meets entry nodes. Expansion is cut at:
//! - entry nodes (collected as destinations, their callers never queued)
//! - virtual nodes other than the origin (virtual dispatch over-approximates)
//! - safe nodes (risk below them is already acknowledged)
//! - interesting nodes other than the origin (their own search reports them)
//! - edges listed in `safe_edges` (statically resolved reflective calls)
//!
//! Searches share nothing but the read-only graph, so [`ReachabilitySearch::search_all`]
//! fans them out over Rayon's pool.

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::graph::CompactCallGraph;
use crate::cancel::CancellationToken;
use crate::method::NodeId;

/// Distance recorded for nodes the search never reached.
pub const UNREACHED: u32 = u32::MAX;

/// Default cap on destinations collected per source.
pub const DEFAULT_MAX_DESTINATIONS: usize = 10;

/// Tunables for a single search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Stop after this many destinations; `None` collects all of them.
    pub max_destinations: Option<usize>,
    /// When false the search stops at the first destination.
    pub return_multiple: bool,
    /// Do not walk through interesting nodes other than the origin.
    pub exclude_interior_sources: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_destinations: Some(DEFAULT_MAX_DESTINATIONS),
            return_multiple: true,
            exclude_interior_sources: true,
        }
    }
}

/// Shortest-path tree of one search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub source: NodeId,
    /// `predecessors[v]` is the node `v` was reached from; unreached nodes
    /// and the source point at themselves.
    pub predecessors: Vec<NodeId>,
    pub distances: Vec<u32>,
    /// Entry nodes in discovery order (nearest first).
    pub destinations: Vec<NodeId>,
}

impl SearchResult {
    /// Nodes from the source to `destination`, inclusive.
    ///
    /// Returns `None` if `destination` was not reached by this search.
    pub fn path_to(&self, destination: NodeId) -> Option<Vec<NodeId>> {
        let mut current = destination as usize;
        if self.distances.get(current).copied().unwrap_or(UNREACHED) == UNREACHED {
            return None;
        }

        let mut path = Vec::with_capacity(self.distances[current] as usize + 1);
        path.push(destination);
        while self.predecessors[current] as usize != current {
            current = self.predecessors[current] as usize;
            path.push(current as NodeId);
        }
        path.reverse();
        Some(path)
    }

    /// One path per destination, in destination order.
    pub fn paths(&self) -> Vec<Vec<NodeId>> {
        self.destinations
            .iter()
            .filter_map(|&d| self.path_to(d))
            .collect()
    }

    /// The source is itself an entry node: a zero-length coincidence.
    pub fn is_self_destination(&self) -> bool {
        self.destinations.len() == 1 && self.destinations[0] == self.source
    }
}

/// Search engine bound to one immutable graph.
#[derive(Debug, Clone, Copy)]
pub struct ReachabilitySearch<'g> {
    graph: &'g CompactCallGraph,
    options: SearchOptions,
}

impl<'g> ReachabilitySearch<'g> {
    pub fn new(graph: &'g CompactCallGraph, options: SearchOptions) -> Self {
        Self { graph, options }
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Run one search from `source`.
    ///
    /// A `source` outside the graph reaches nothing: the result has no
    /// destinations and every distance is [`UNREACHED`].
    pub fn search(&self, source: NodeId) -> SearchResult {
        self.run(source, None)
            .unwrap_or_else(|| unreachable!("search without a token cannot be cancelled"))
    }

    /// Run one search, giving up (returning `None`) once `cancel` fires.
    pub fn search_cancellable(
        &self,
        source: NodeId,
        cancel: &CancellationToken,
    ) -> Option<SearchResult> {
        self.run(source, Some(cancel))
    }

    /// Search from every interesting node in parallel, handing each result
    /// to `on_result` as soon as it completes. Returns the number of
    /// searches that ran to completion.
    pub fn search_all<F>(&self, cancel: &CancellationToken, on_result: F) -> usize
    where
        F: Fn(SearchResult) + Sync,
    {
        let sources = self.graph.interesting_nodes();
        let total = sources.len();
        let completed = AtomicUsize::new(0);

        tracing::info!(sources = total, "starting reachability searches");

        sources.into_par_iter().for_each(|source| {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(result) = self.run(source, Some(cancel)) {
                on_result(result);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 1000 == 0 {
                    tracing::debug!(done, total, "search progress");
                }
            }
        });

        completed.into_inner()
    }

    fn run(&self, source: NodeId, cancel: Option<&CancellationToken>) -> Option<SearchResult> {
        let g = self.graph;
        let n = g.node_count();
        let s = source as usize;

        let mut predecessors: Vec<NodeId> = (0..n as NodeId).collect();
        let mut distances = vec![UNREACHED; n];
        let mut discovered = vec![false; n];
        let mut destinations = Vec::new();

        if s >= n {
            tracing::debug!(source, nodes = n, "search source outside the graph");
            return Some(SearchResult {
                source,
                predecessors,
                distances,
                destinations,
            });
        }

        distances[s] = 0;
        discovered[s] = true;

        if g.is_entry(source) {
            destinations.push(source);
            return Some(SearchResult {
                source,
                predecessors,
                distances,
                destinations,
            });
        }

        let cap = if self.options.return_multiple {
            self.options.max_destinations.unwrap_or(usize::MAX).max(1)
        } else {
            1
        };

        // Flat queue: every node is pushed at most once.
        let mut queue: Vec<NodeId> = Vec::with_capacity(64);
        queue.push(source);
        let mut head = 0;

        'search: while head < queue.len() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return None;
            }
            let u = queue[head];
            head += 1;

            if u != source && g.is_virtual(u) {
                continue;
            }
            if g.is_safe(u) {
                continue;
            }

            for &v in g.callers(u) {
                let vi = v as usize;
                if discovered[vi] || g.is_safe_edge(u, v) {
                    continue;
                }
                discovered[vi] = true;
                predecessors[vi] = u;
                distances[vi] = distances[u as usize] + 1;

                if g.is_safe(v) {
                    continue;
                }
                if g.is_entry(v) {
                    destinations.push(v);
                    if destinations.len() >= cap {
                        break 'search;
                    }
                    continue;
                }
                if self.options.exclude_interior_sources && g.is_interesting(v) {
                    continue;
                }
                queue.push(v);
            }
        }

        Some(SearchResult {
            source,
            predecessors,
            distances,
            destinations,
        })
    }
}
