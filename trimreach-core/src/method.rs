//! Method identity and metadata supplied by the external graph builder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense zero-based method index used by every hot-path algorithm.
pub type NodeId = u32;

/// Opaque method identity as handed over by the graph builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub String);

impl MethodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata for one resolved method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub id: MethodId,
    /// Simple method name (`GetMethod`, `.ctor`)
    pub name: String,
    /// Name plus parameter types, e.g. `GetMethod(System.String)`
    pub signature: String,
    /// Full name of the declaring type (`System.Type`, `Outer/Inner`)
    pub declaring_type: String,
    /// Namespace of the outermost declaring type; empty for the global namespace
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub assembly: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_virtual: bool,
}

impl MethodInfo {
    /// `DeclaringType::Signature`, the form frames are printed and matched in.
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.signature)
    }

    /// Part of the externally observable surface: callable from outside or
    /// reachable through virtual dispatch.
    pub fn is_entry(&self) -> bool {
        self.is_public || self.is_virtual
    }
}
