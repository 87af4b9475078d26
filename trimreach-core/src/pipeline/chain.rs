//! Chain values passed from the searches to the report.

use serde::Serialize;

use crate::annotations::ApiAnnotation;
use crate::method::NodeId;

/// What a search worker hands to the consumer: the node paths of one
/// search, source first. Compact on purpose; predecessor arrays stay on
/// the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFinding {
    pub source: NodeId,
    pub paths: Vec<Vec<NodeId>>,
}

/// Items on the producer/consumer channel.
#[derive(Debug)]
pub enum PipelineMessage {
    Found(RawFinding),
    /// Every producer has finished; nothing follows.
    Done,
}

/// One reportable chain from a dangerous method up to an entry method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedChain {
    /// Path nodes, dangerous end first. Unresolved nodes are kept here so
    /// grouping stays stable.
    pub nodes: Vec<NodeId>,
    /// Printable frames for resolved nodes, same order.
    pub frames: Vec<String>,
    /// Classified category
    pub category: String,
    pub annotation: ApiAnnotation,
}

impl ReportedChain {
    /// `---------- (category: message)`
    pub fn header(&self) -> String {
        format!("---------- ({})", self.annotation)
    }

    pub fn source(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn entry(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn key(&self) -> ChainKey {
        ChainKey {
            nodes: self.nodes.clone(),
            category: self.category.clone(),
            annotation: self.annotation.to_string(),
        }
    }
}

/// Identity used to collapse chains reached through different searches.
/// The annotation text is part of it so distinct unresolved call sites
/// sharing a path stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainKey {
    pub nodes: Vec<NodeId>,
    pub category: String,
    pub annotation: String,
}
