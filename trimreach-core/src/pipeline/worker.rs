//! The single consumer of search results.
//!
//! Owns every piece of mutable report state. Producers only ever touch the
//! channel, so nothing here is locked.

use crossbeam_channel::Receiver;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use super::chain::{ChainKey, PipelineMessage, RawFinding, ReportedChain};
use super::classify::ChainClassifier;
use super::grouping::{node_label, GroupKind, Grouping};
use super::sink::ChainSink;
use crate::annotations::{AnnotationModel, ApiAnnotation};
use crate::cancel::CancellationToken;
use crate::coverage::{CoverageSummary, CoverageTracker};
use crate::error::{TrimreachError, TrimreachResult};
use crate::index::IndexSpace;
use crate::method::{MethodInfo, NodeId};

/// Chain count of one top-level group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

/// Aggregates returned once the queue is drained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    /// Distinct chains handed to the sink
    pub chains: usize,
    pub duplicates: usize,
    /// Chains dropped because their source is suppressed
    pub suppressed: usize,
    /// Findings received from the searches
    pub findings: usize,
    /// Chain count per annotation category
    pub per_annotation_category: BTreeMap<String, usize>,
    /// Chain count per classified bucket
    pub per_category: BTreeMap<String, usize>,
    /// Top-level groups, largest first (empty when ungrouped)
    pub groups: Vec<GroupCount>,
    /// Interesting methods that are themselves entries
    pub exposed_sources: Vec<String>,
    pub coverage: CoverageSummary,
}

#[derive(Debug, Default)]
struct GroupNode {
    kind: Option<GroupKind>,
    count: usize,
    chains: BTreeMap<ChainKey, ReportedChain>,
    children: BTreeMap<String, GroupNode>,
}

impl GroupNode {
    fn insert(&mut self, path: &[(GroupKind, String)], key: ChainKey, chain: ReportedChain) {
        self.count += 1;
        match path.split_first() {
            None => {
                self.chains.insert(key, chain);
            }
            Some(((kind, label), rest)) => {
                let child = self.children.entry(label.clone()).or_default();
                child.kind = Some(*kind);
                child.insert(rest, key, chain);
            }
        }
    }

    /// Children by descending size, ties by label.
    fn ordered_children(&self) -> Vec<(&String, &GroupNode)> {
        let mut children: Vec<_> = self.children.iter().collect();
        children.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        children
    }

    fn emit<S: ChainSink + ?Sized>(&self, sink: &mut S) -> TrimreachResult<()> {
        for chain in self.chains.values() {
            sink.chain(chain)?;
        }
        for (label, child) in self.ordered_children() {
            let kind = child.kind.unwrap_or(GroupKind::Method);
            sink.begin_group(kind, label, child.count)?;
            child.emit(sink)?;
            sink.end_group()?;
        }
        Ok(())
    }
}

/// Consumer side of the search pipeline.
pub struct ResultPipeline<'a, S: ChainSink> {
    space: &'a IndexSpace<MethodInfo>,
    model: &'a AnnotationModel,
    grouping: Grouping,
    classifier: ChainClassifier,
    sink: S,
    seen: BTreeSet<ChainKey>,
    groups: GroupNode,
    exposed: BTreeSet<NodeId>,
    coverage: CoverageTracker,
    summary: PipelineSummary,
}

impl<'a, S: ChainSink> ResultPipeline<'a, S> {
    pub fn new(
        space: &'a IndexSpace<MethodInfo>,
        model: &'a AnnotationModel,
        grouping: Grouping,
        sink: S,
    ) -> Self {
        Self {
            space,
            model,
            grouping,
            classifier: ChainClassifier::default(),
            sink,
            seen: BTreeSet::new(),
            groups: GroupNode::default(),
            exposed: BTreeSet::new(),
            coverage: CoverageTracker::new(),
            summary: PipelineSummary::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: ChainClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Drains `rx` until the `Done` sentinel, then writes grouped output
    /// and returns the aggregates.
    pub fn run(
        mut self,
        rx: Receiver<PipelineMessage>,
        cancel: &CancellationToken,
    ) -> TrimreachResult<PipelineSummary> {
        loop {
            if cancel.is_cancelled() {
                debug!("consumer stopping on cancellation");
                return Err(TrimreachError::Cancelled);
            }
            match rx.recv() {
                Ok(PipelineMessage::Found(finding)) => self.process(finding)?,
                Ok(PipelineMessage::Done) => {
                    // Producers also stop early on cancellation; their
                    // sentinel then closes a partial run.
                    if cancel.is_cancelled() {
                        debug!("completion signal after cancellation");
                        return Err(TrimreachError::Cancelled);
                    }
                    break;
                }
                Err(_) => {
                    return Err(TrimreachError::internal(
                        "result channel closed before completion",
                    ))
                }
            }
        }
        self.finish()
    }

    /// Handles one search's paths.
    pub fn process(&mut self, finding: RawFinding) -> TrimreachResult<()> {
        self.summary.findings += 1;
        let model = self.model;
        let Some(annotation) = model.annotation(finding.source) else {
            debug!(source = finding.source, "finding for a method without annotation");
            return Ok(());
        };

        for path in finding.paths {
            if path.len() < 2 {
                self.exposed.insert(finding.source);
                continue;
            }
            match annotation {
                ApiAnnotation::Suppress { .. } => self.summary.suppressed += 1,
                ApiAnnotation::Warn { .. } => self.record(path, annotation.clone())?,
                ApiAnnotation::Unanalyzed { calls } => {
                    for call in calls {
                        let mut nodes = Vec::with_capacity(path.len() + 1);
                        nodes.push(call.reflection_method);
                        nodes.extend_from_slice(&path);
                        let warn = ApiAnnotation::warn(&call.category, &call.message, call.aspect);
                        self.record(nodes, warn)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, nodes: Vec<NodeId>, annotation: ApiAnnotation) -> TrimreachResult<()> {
        let frames: Vec<String> = nodes
            .iter()
            .filter_map(|&n| self.space.method_of(n).map(MethodInfo::full_name))
            .collect();
        let category = self.classifier.classify(&nodes, &frames, self.space);
        let chain = ReportedChain {
            nodes,
            frames,
            category,
            annotation,
        };

        let key = chain.key();
        if !self.seen.insert(key.clone()) {
            self.summary.duplicates += 1;
            return Ok(());
        }

        self.summary.chains += 1;
        *self
            .summary
            .per_annotation_category
            .entry(chain.annotation.category().to_string())
            .or_insert(0) += 1;
        *self
            .summary
            .per_category
            .entry(chain.category.clone())
            .or_insert(0) += 1;
        if let Some(entry) = chain.entry().and_then(|n| self.space.method_of(n)) {
            self.coverage.record(entry);
        }

        if self.grouping.is_grouped() {
            let path = self.grouping.group_path(&chain, self.space);
            self.groups.insert(&path, key, chain);
            Ok(())
        } else {
            self.sink.chain(&chain)
        }
    }

    /// Emits buffered groups, finishes the sink and returns the aggregates.
    pub fn finish(mut self) -> TrimreachResult<PipelineSummary> {
        if self.grouping.is_grouped() {
            self.groups.emit(&mut self.sink)?;
            self.summary.groups = self
                .groups
                .ordered_children()
                .into_iter()
                .map(|(label, node)| GroupCount {
                    group: label.clone(),
                    count: node.count,
                })
                .collect();
        }
        self.sink.finish()?;

        self.summary.exposed_sources = self
            .exposed
            .iter()
            .map(|&n| node_label(self.space, Some(n)))
            .collect();
        self.summary.coverage = self.coverage.summarize(self.space);

        info!(
            chains = self.summary.chains,
            duplicates = self.summary.duplicates,
            suppressed = self.summary.suppressed,
            exposed = self.summary.exposed_sources.len(),
            "result pipeline drained"
        );
        Ok(self.summary)
    }
}
