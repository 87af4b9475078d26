//! Records the reflection scanner's per-call-site verdicts.
//!
//! Recognized calls become safe edges in the call graph. Unrecognized calls
//! accumulate into Unanalyzed annotations on the calling method.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::annotations::{AnnotationModel, Aspect, UnanalyzedCall, UNANALYZED_CATEGORY};
use crate::index::IndexSpace;
use crate::input::ReflectionInput;
use crate::method::{MethodInfo, NodeId};

#[derive(Debug, Clone, Default)]
pub struct ReflectionVerdicts {
    /// reflection method -> callers whose call into it was resolved
    resolved: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// caller -> unresolved call sites, in report order
    unanalyzed: BTreeMap<NodeId, Vec<UnanalyzedCall>>,
}

impl ReflectionVerdicts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves identities in `input` against `space`; verdicts naming
    /// unknown methods are dropped.
    pub fn from_input(input: &ReflectionInput, space: &IndexSpace<MethodInfo>) -> Self {
        let mut verdicts = Self::new();
        let mut skipped = 0usize;

        for call in &input.recognized {
            match (space.index_of(&call.caller), space.index_of(&call.reflection_method)) {
                (Some(caller), Some(target)) => verdicts.recognized(caller, target),
                _ => skipped += 1,
            }
        }
        for call in &input.unrecognized {
            match (space.index_of(&call.caller), space.index_of(&call.reflection_method)) {
                (Some(caller), Some(target)) => verdicts.unrecognized(
                    caller,
                    target,
                    call.aspect,
                    call.message.clone(),
                    call.category.clone(),
                ),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(skipped, "reflection verdicts referencing unknown methods");
        }
        verdicts
    }

    pub fn recognized(&mut self, caller: NodeId, reflection_method: NodeId) {
        self.resolved
            .entry(reflection_method)
            .or_default()
            .insert(caller);
    }

    pub fn unrecognized(
        &mut self,
        caller: NodeId,
        reflection_method: NodeId,
        aspect: Aspect,
        message: String,
        category: Option<String>,
    ) {
        self.unanalyzed.entry(caller).or_default().push(UnanalyzedCall {
            reflection_method,
            message,
            category: category.unwrap_or_else(|| UNANALYZED_CATEGORY.to_string()),
            aspect,
        });
    }

    /// Folds unresolved call sites into `model`. Returns how many methods
    /// gained or extended an Unanalyzed record.
    pub fn apply(&self, model: &mut AnnotationModel) -> usize {
        let mut touched = 0;
        for (&caller, calls) in &self.unanalyzed {
            let mut accepted = false;
            for call in calls {
                accepted |= model.record_unanalyzed(caller, call.clone());
            }
            if accepted {
                touched += 1;
            }
        }
        touched
    }

    /// Per-node sorted caller lists: `result[callee]` holds the callers
    /// whose call into `callee` was statically resolved.
    pub fn safe_edges(&self, node_count: usize) -> Vec<Vec<NodeId>> {
        let mut edges = vec![Vec::new(); node_count];
        for (&callee, callers) in &self.resolved {
            if let Some(slot) = edges.get_mut(callee as usize) {
                slot.extend(callers.iter().copied());
            }
        }
        edges
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.values().map(BTreeSet::len).sum()
    }

    pub fn unanalyzed_count(&self) -> usize {
        self.unanalyzed.values().map(Vec::len).sum()
    }
}
