//! Per-node annotation state and virtual-override propagation.
//!
//! The model is mutated during seeding and a single propagation phase; after
//! that it is only read, so search workers can share it by reference.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

use super::annotation::{ApiAnnotation, UnanalyzedCall};
use crate::method::NodeId;
use crate::overrides::OverrideIndex;

/// How the search treats a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Search source: annotated and not marked safe.
    Interesting,
    /// Trim-friendly: the search never continues past it.
    Safe,
    Unannotated,
}

/// Counters from one propagation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationStats {
    /// Overrides that had no annotation and inherited one
    pub applied: usize,
    /// Overrides whose Unanalyzed record was replaced by an inherited Warn
    pub overwritten: usize,
    /// Overrides left untouched because they already carried an annotation
    pub conflicts: usize,
}

impl PropagationStats {
    pub fn changed(&self) -> usize {
        self.applied + self.overwritten
    }
}

/// Annotation state for every node in the index space.
#[derive(Debug, Clone, Default)]
pub struct AnnotationModel {
    annotations: Vec<Option<ApiAnnotation>>,
    safe: Vec<bool>,
}

impl AnnotationModel {
    pub fn new(node_count: usize) -> Self {
        Self {
            annotations: vec![None; node_count],
            safe: vec![false; node_count],
        }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn annotation(&self, node: NodeId) -> Option<&ApiAnnotation> {
        self.annotations.get(node as usize).and_then(Option::as_ref)
    }

    /// Attach a configured annotation. The first annotation for a node wins;
    /// returns false (and logs) when `node` was already annotated.
    pub fn annotate(&mut self, node: NodeId, annotation: ApiAnnotation) -> bool {
        let Some(slot) = self.annotations.get_mut(node as usize) else {
            return false;
        };
        match slot {
            Some(existing) if !existing.is_unanalyzed() => {
                warn!(
                    node,
                    existing = %existing,
                    rejected = %annotation,
                    "method already has an annotation, ignoring another one"
                );
                false
            }
            _ => {
                *slot = Some(annotation);
                true
            }
        }
    }

    /// Add one unresolved reflective call site to `node`. Ignored when the
    /// node already carries a configured Warn or Suppress.
    pub fn record_unanalyzed(&mut self, node: NodeId, call: UnanalyzedCall) -> bool {
        let Some(slot) = self.annotations.get_mut(node as usize) else {
            return false;
        };
        match slot {
            None => {
                *slot = Some(ApiAnnotation::Unanalyzed { calls: vec![call] });
                true
            }
            Some(ApiAnnotation::Unanalyzed { calls }) => {
                calls.push(call);
                true
            }
            Some(existing) => {
                debug!(node, existing = %existing, "configured annotation takes precedence over unanalyzed call");
                false
            }
        }
    }

    pub fn mark_safe(&mut self, node: NodeId) {
        if let Some(flag) = self.safe.get_mut(node as usize) {
            *flag = true;
        }
    }

    pub fn is_safe(&self, node: NodeId) -> bool {
        self.safe.get(node as usize).copied().unwrap_or(false)
    }

    pub fn classify(&self, node: NodeId) -> NodeClass {
        if self.is_safe(node) {
            NodeClass::Safe
        } else if self.annotation(node).is_some() {
            NodeClass::Interesting
        } else {
            NodeClass::Unannotated
        }
    }

    pub fn is_interesting(&self, node: NodeId) -> bool {
        self.classify(node) == NodeClass::Interesting
    }

    pub fn interesting_flags(&self) -> Vec<bool> {
        (0..self.len() as NodeId).map(|n| self.is_interesting(n)).collect()
    }

    pub fn safe_flags(&self) -> Vec<bool> {
        self.safe.clone()
    }

    /// Interesting node count per annotation category.
    pub fn interesting_per_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in 0..self.len() as NodeId {
            if let (true, Some(annotation)) = (self.is_interesting(node), self.annotation(node)) {
                *counts.entry(annotation.category().to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Copy Warn annotations from virtual methods onto every transitive
    /// override.
    ///
    /// An override with no annotation, or only an Unanalyzed record, takes
    /// the inherited Warn and is queued to pass it on. Any other existing
    /// annotation is kept. Each node changes state at most once, so the
    /// loop terminates even when the override relation has cycles.
    pub fn propagate_overrides(
        &mut self,
        overrides: &OverrideIndex,
        is_virtual: &[bool],
    ) -> PropagationStats {
        let mut stats = PropagationStats::default();
        let mut queue: VecDeque<(NodeId, ApiAnnotation)> = self
            .annotations
            .iter()
            .enumerate()
            .filter(|(i, _)| is_virtual.get(*i).copied().unwrap_or(false))
            .filter_map(|(i, a)| match a {
                Some(a @ ApiAnnotation::Warn { .. }) => Some((i as NodeId, a.clone())),
                _ => None,
            })
            .collect();

        while let Some((base, inherited)) = queue.pop_front() {
            for overriding in overrides.overrides_of(base) {
                let Some(slot) = self.annotations.get_mut(overriding as usize) else {
                    continue;
                };
                match slot {
                    None => stats.applied += 1,
                    Some(existing @ ApiAnnotation::Unanalyzed { .. }) => {
                        info!(node = overriding, existing = %existing, "overwriting annotation with inherited warning");
                        stats.overwritten += 1;
                    }
                    Some(existing) => {
                        if *existing == inherited {
                            debug!(node = overriding, base, "override already carries the inherited annotation");
                        } else {
                            warn!(
                                node = overriding,
                                base,
                                existing = %existing,
                                inherited = %inherited,
                                "skipping implied annotation since the override already has one"
                            );
                        }
                        stats.conflicts += 1;
                        continue;
                    }
                }
                *slot = Some(inherited.clone());
                queue.push_back((overriding, inherited.clone()));
            }
        }

        info!(
            applied = stats.applied,
            overwritten = stats.overwritten,
            conflicts = stats.conflicts,
            "propagated annotations to overrides"
        );
        stats
    }
}
