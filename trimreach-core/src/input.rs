//! Program graph interchange format.
//!
//! The graph builder, the override index and the reflection scanner live
//! outside this crate. They hand over one JSON document:
//!
//! ```text
//! {
//!   "methods":   [ { "id": "...", "name": "...", "signature": "...", ... } ],
//!   "edges":     [ ["caller-id", "callee-id"], ... ],
//!   "overrides": [ ["base-id", "override-id"], ... ],
//!   "reflection": {
//!     "recognized":   [ { "caller": "...", "reflection_method": "..." } ],
//!     "unrecognized": [ { "caller": "...", "reflection_method": "...",
//!                         "aspect": "MemberTrimming", "message": "...",
//!                         "category": null } ]
//!   }
//! }
//! ```
//!
//! Edges may name methods that have no entry in `methods`; those become
//! unresolved nodes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::annotations::Aspect;
use crate::error::{IoResultExt, TrimreachError, TrimreachResult};
use crate::index::IndexSpace;
use crate::method::{MethodId, MethodInfo, NodeId};

/// A reflective call whose target the scanner resolved statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedCall {
    pub caller: MethodId,
    pub reflection_method: MethodId,
}

/// A reflective call the scanner could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedCall {
    pub caller: MethodId,
    pub reflection_method: MethodId,
    pub aspect: Aspect,
    pub message: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Reflection scanner verdicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionInput {
    #[serde(default)]
    pub recognized: Vec<RecognizedCall>,
    #[serde(default)]
    pub unrecognized: Vec<UnrecognizedCall>,
}

/// Everything the engine consumes from its external collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramGraph {
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    /// `(caller, callee)` pairs
    #[serde(default)]
    pub edges: Vec<(MethodId, MethodId)>,
    /// `(base, override)` pairs
    #[serde(default)]
    pub overrides: Vec<(MethodId, MethodId)>,
    #[serde(default)]
    pub reflection: ReflectionInput,
}

impl ProgramGraph {
    pub fn load(path: &Path) -> TrimreachResult<Self> {
        let text = fs::read_to_string(path).with_path(path)?;
        let graph = Self::from_json_str(&text)
            .map_err(|e| TrimreachError::input(path, e.to_string()))?;
        info!(
            path = %path.display(),
            methods = graph.methods.len(),
            edges = graph.edges.len(),
            overrides = graph.overrides.len(),
            "loaded program graph"
        );
        Ok(graph)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builds the index space. Methods with metadata take the first
    /// indices in declaration order; methods only referenced by edges or
    /// reflection verdicts follow in first-seen order.
    pub fn index_space(&self) -> IndexSpace<MethodInfo> {
        let mut space = IndexSpace::new();
        for method in &self.methods {
            space.insert(&method.id, method.clone());
        }
        let declared = space.len();
        for (caller, callee) in &self.edges {
            space.intern(caller);
            space.intern(callee);
        }
        for call in &self.reflection.recognized {
            space.intern(&call.caller);
            space.intern(&call.reflection_method);
        }
        for call in &self.reflection.unrecognized {
            space.intern(&call.caller);
            space.intern(&call.reflection_method);
        }
        if space.len() > declared {
            debug!(
                unresolved = space.len() - declared,
                "methods referenced without metadata"
            );
        }
        space
    }

    /// Edge list over node indices. Every endpoint must already be interned
    /// in `space`, which holds for the space returned by `index_space`.
    pub fn indexed_edges(&self, space: &IndexSpace<MethodInfo>) -> Vec<(NodeId, NodeId)> {
        self.edges
            .iter()
            .filter_map(|(caller, callee)| Some((space.index_of(caller)?, space.index_of(callee)?)))
            .collect()
    }
}
