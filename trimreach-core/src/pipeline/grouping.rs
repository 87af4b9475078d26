//! Grouping modes for the chain report.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::chain::ReportedChain;
use crate::error::TrimreachError;
use crate::index::IndexSpace;
use crate::method::{MethodInfo, NodeId};

/// How chains are bucketed in the report. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    /// Stream every chain as it is classified.
    None,
    /// By entry (outermost) frame.
    Caller,
    /// By assembly of the immediate caller, then category, then the
    /// `(immediate caller, dangerous callee)` pair.
    ImmediateCaller,
    /// By dangerous frame.
    #[default]
    Callee,
}

/// Kind of a group level, used by sinks for headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    Method,
    Assembly,
    Category,
    Dependency,
}

impl Grouping {
    pub fn is_grouped(self) -> bool {
        self != Grouping::None
    }

    /// Group path for `chain`, outermost level first. Empty when ungrouped.
    pub fn group_path(
        self,
        chain: &ReportedChain,
        space: &IndexSpace<MethodInfo>,
    ) -> Vec<(GroupKind, String)> {
        let first = chain.nodes.first().copied();
        match self {
            Grouping::None => Vec::new(),
            Grouping::Callee => vec![(GroupKind::Method, node_label(space, first))],
            Grouping::Caller => vec![(GroupKind::Method, node_label(space, chain.entry()))],
            Grouping::ImmediateCaller => {
                let caller = chain.nodes.get(1).copied().or(first);
                let assembly = caller
                    .and_then(|n| space.method_of(n))
                    .map(|m| m.assembly.clone())
                    .unwrap_or_default();
                vec![
                    (GroupKind::Assembly, assembly),
                    (GroupKind::Category, chain.annotation.category().to_string()),
                    (
                        GroupKind::Dependency,
                        format!(
                            "{} depends on {}",
                            node_label(space, caller),
                            node_label(space, first)
                        ),
                    ),
                ]
            }
        }
    }
}

/// Full name of a resolved node, its raw identity otherwise.
pub fn node_label(space: &IndexSpace<MethodInfo>, node: Option<NodeId>) -> String {
    let Some(node) = node else {
        return String::from("<none>");
    };
    match space.method_of(node) {
        Some(m) => m.full_name(),
        None => space
            .id_of(node)
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("<node {}>", node)),
    }
}

impl FromStr for Grouping {
    type Err = TrimreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "caller" => Ok(Self::Caller),
            "immediate-caller" | "immediatecaller" | "immediate_caller" => Ok(Self::ImmediateCaller),
            "callee" => Ok(Self::Callee),
            other => Err(TrimreachError::invalid_argument(format!(
                "unknown grouping '{}' (expected none, caller, immediate-caller or callee)",
                other
            ))),
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Caller => "caller",
            Self::ImmediateCaller => "immediate-caller",
            Self::Callee => "callee",
        })
    }
}
