//! Fluent entry point that runs the whole analysis.
//!
//! ```rust,ignore
//! use trimreach_core::prelude::*;
//!
//! let program = ProgramGraph::load(std::path::Path::new("graph.json"))?;
//! let report = Analyzer::new(&program)
//!     .annotation_files(["configs/"])
//!     .grouping(Grouping::Callee)
//!     .run(TextSink::new(std::io::stdout()))?;
//!
//! println!("{} chains", report.pipeline.chains);
//! ```
//!
//! # Phases
//!
//! 1. Index every method the program graph mentions.
//! 2. Seed annotations from configuration, then from reflection verdicts.
//! 3. Propagate Warn annotations to overrides.
//! 4. Freeze flags and build the compact call graph.
//! 5. Search from every interesting node on Rayon's pool while a single
//!    consumer thread drains the results into the sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::annotations::{
    apply_entries, load_annotation_paths, AnnotationEntry, AnnotationModel, ApplyStats,
    PropagationStats,
};
use crate::callgraph::{CallGraphStats, CompactCallGraph, NodeFlags, ReachabilitySearch, SearchOptions};
use crate::cancel::CancellationToken;
use crate::error::{TrimreachError, TrimreachResult};
use crate::index::IndexSpace;
use crate::input::ProgramGraph;
use crate::method::{MethodInfo, NodeId};
use crate::overrides::OverrideIndex;
use crate::pipeline::{ChainSink, Grouping, PipelineMessage, PipelineSummary, RawFinding, ResultPipeline};
use crate::reflection::ReflectionVerdicts;

/// Builder for one analysis run.
#[derive(Debug, Clone)]
pub struct Analyzer<'p> {
    program: &'p ProgramGraph,
    annotation_paths: Vec<PathBuf>,
    entries: Vec<AnnotationEntry>,
    options: SearchOptions,
    grouping: Grouping,
    cancel: CancellationToken,
}

/// Everything built before the searches start. Read-only from then on.
#[derive(Debug)]
pub struct PreparedAnalysis {
    pub space: IndexSpace<MethodInfo>,
    pub model: AnnotationModel,
    pub graph: CompactCallGraph,
    pub annotations: ApplyStats,
    pub propagation: PropagationStats,
    pub unanalyzed_methods: usize,
    pub resolved_reflection_calls: usize,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub grouping: Grouping,
    pub graph: CallGraphStats,
    pub resolved_methods: usize,
    /// Interesting methods per annotation category
    pub interesting_per_category: BTreeMap<String, usize>,
    pub annotations: ApplyStats,
    pub propagation: PropagationStats,
    pub unanalyzed_methods: usize,
    pub resolved_reflection_calls: usize,
    /// Searches that ran to completion
    pub searches: usize,
    pub pipeline: PipelineSummary,
}

impl AnalysisReport {
    pub fn has_findings(&self) -> bool {
        self.pipeline.chains > 0
    }

    /// Human-readable run summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("found {} methods", self.graph.node_count),
            format!("found {} entry methods", self.graph.entry_count),
            format!("found {} \"interesting\" methods", self.graph.interesting_count),
            format!("found {} stack traces", self.pipeline.chains),
        ];

        let mut buckets: Vec<(&String, &usize)> = self.pipeline.per_category.iter().collect();
        buckets.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        lines.extend(
            buckets
                .into_iter()
                .map(|(category, count)| format!("{} stack traces are {}", count, category)),
        );

        if !self.pipeline.exposed_sources.is_empty() {
            lines.push(format!(
                "{} interesting methods are entries themselves",
                self.pipeline.exposed_sources.len()
            ));
        }
        lines.push("----------".to_string());
        lines.extend(self.pipeline.coverage.lines());
        lines
    }
}

impl<'p> Analyzer<'p> {
    pub fn new(program: &'p ProgramGraph) -> Self {
        Self {
            program,
            annotation_paths: Vec::new(),
            entries: Vec::new(),
            options: SearchOptions::default(),
            grouping: Grouping::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Annotation configuration files or directories to load.
    pub fn annotation_files(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.annotation_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Already-parsed entries, applied after the files.
    pub fn annotation_entries(mut self, entries: impl IntoIterator<Item = AnnotationEntry>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn search_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Token that stops the run. A sink failure also fires it.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Phases 1-4.
    pub fn prepare(&self) -> TrimreachResult<PreparedAnalysis> {
        let space = self.program.index_space();
        let n = space.len();
        let mut model = AnnotationModel::new(n);

        let mut entries = load_annotation_paths(&self.annotation_paths)?;
        entries.extend(self.entries.iter().cloned());
        let annotations = apply_entries(&entries, &space, &mut model);

        let verdicts = ReflectionVerdicts::from_input(&self.program.reflection, &space);
        let unanalyzed_methods = verdicts.apply(&mut model);

        let overrides = OverrideIndex::from_pairs(&space, &self.program.overrides);
        let mut flags = NodeFlags::new(n);
        for (node, method) in space.iter() {
            flags.is_entry[node as usize] = method.is_entry();
            flags.is_virtual[node as usize] = method.is_virtual;
        }
        let propagation = model.propagate_overrides(&overrides, &flags.is_virtual);

        flags.is_interesting = model.interesting_flags();
        flags.is_safe = model.safe_flags();

        let edges = self.program.indexed_edges(&space);
        let graph = CompactCallGraph::build(n, &edges, flags, verdicts.safe_edges(n));
        let stats = graph.stats();
        info!(
            methods = stats.node_count,
            edges = stats.edge_count,
            entries = stats.entry_count,
            interesting = stats.interesting_count,
            safe = stats.safe_count,
            "built call graph"
        );

        Ok(PreparedAnalysis {
            space,
            model,
            graph,
            annotations,
            propagation,
            unanalyzed_methods,
            resolved_reflection_calls: verdicts.resolved_count(),
        })
    }

    /// Runs every phase, streaming chains into `sink`.
    pub fn run<S: ChainSink + Send>(&self, sink: S) -> TrimreachResult<AnalysisReport> {
        let prepared = self.prepare()?;
        self.run_prepared(&prepared, sink)
    }

    /// Phase 5 over an already prepared analysis.
    pub fn run_prepared<S: ChainSink + Send>(
        &self,
        prepared: &PreparedAnalysis,
        sink: S,
    ) -> TrimreachResult<AnalysisReport> {
        if self.cancel.is_cancelled() {
            return Err(TrimreachError::Cancelled);
        }

        let search = ReachabilitySearch::new(&prepared.graph, self.options);
        let cancel = &self.cancel;
        let space = &prepared.space;
        let model = &prepared.model;
        let grouping = self.grouping;
        let (tx, rx) = crossbeam_channel::unbounded::<PipelineMessage>();

        let (pipeline, searches) = std::thread::scope(|scope| {
            let consumer = scope.spawn(move || {
                ResultPipeline::new(space, model, grouping, sink).run(rx, cancel)
            });

            let searches = search.search_all(cancel, |result| {
                let paths: Vec<Vec<NodeId>> = result.paths();
                if paths.is_empty() {
                    return;
                }
                let finding = RawFinding {
                    source: result.source,
                    paths,
                };
                if tx.send(PipelineMessage::Found(finding)).is_err() {
                    // Consumer is gone; stop the remaining searches.
                    cancel.cancel();
                }
            });
            if tx.send(PipelineMessage::Done).is_err() {
                debug!("consumer exited before completion signal");
            }

            let pipeline = consumer
                .join()
                .map_err(|_| TrimreachError::internal("result consumer panicked"))?;
            Ok::<_, TrimreachError>((pipeline, searches))
        })?;
        let pipeline = pipeline?;
        // The token may fire after the consumer's last check, e.g. while
        // grouped output is written. Searches skipped by then make the
        // summary partial.
        if self.cancel.is_cancelled() {
            return Err(TrimreachError::Cancelled);
        }

        Ok(AnalysisReport {
            generated_at: Utc::now(),
            grouping: self.grouping,
            graph: prepared.graph.stats(),
            resolved_methods: prepared.space.resolved_count(),
            interesting_per_category: prepared.model.interesting_per_category(),
            annotations: prepared.annotations,
            propagation: prepared.propagation,
            unanalyzed_methods: prepared.unanalyzed_methods,
            resolved_reflection_calls: prepared.resolved_reflection_calls,
            searches,
            pipeline,
        })
    }
}
