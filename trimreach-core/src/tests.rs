//! End-to-end test suite for trimreach-core.

use crate::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn method(id: &str, ty: &str, name: &str, public: bool, virt: bool) -> MethodInfo {
    MethodInfo {
        id: MethodId::new(id),
        name: name.to_string(),
        signature: format!("{}()", name),
        declaring_type: ty.to_string(),
        namespace: ty.rsplit_once('.').map(|(ns, _)| ns.to_string()).unwrap_or_default(),
        assembly: ty.split('.').next().unwrap_or_default().to_string(),
        is_public: public,
        is_virtual: virt,
    }
}

fn edge(caller: &str, callee: &str) -> (MethodId, MethodId) {
    (MethodId::new(caller), MethodId::new(callee))
}

fn entries(json: &str) -> Vec<AnnotationEntry> {
    parse_annotation_config(Path::new("inline.analysisconfig.json"), json).unwrap()
}

fn warn_entry(ty: &str, message: &str) -> Vec<AnnotationEntry> {
    entries(&format!(
        r#"[{{ "Type": "{}", "Methods": ["*"], "Aspect": "MemberTrimming", "Category": "Reflection", "Warn": "{}" }}]"#,
        ty, message
    ))
}

fn run(analyzer: &Analyzer<'_>) -> (AnalysisReport, MemorySink) {
    let mut sink = MemorySink::new();
    let report = analyzer.run(&mut sink).unwrap();
    (report, sink)
}

/// A calls B, B calls C. C is dangerous, A is public.
fn abc_program() -> ProgramGraph {
    ProgramGraph {
        methods: vec![
            method("a", "App.Api", "A", true, false),
            method("b", "App.Impl", "B", false, false),
            method("c", "Lib.Danger", "C", false, false),
        ],
        edges: vec![edge("a", "b"), edge("b", "c")],
        ..ProgramGraph::default()
    }
}

// Scenario: A -> B -> C finds A with chain C, B, A
#[test]
fn test_chain_from_dangerous_to_entry() {
    let program = abc_program();
    let analyzer = Analyzer::new(&program)
        .annotation_entries(warn_entry("Lib.Danger", "uses reflection"))
        .grouping(Grouping::None);
    let (report, sink) = run(&analyzer);

    assert_eq!(report.pipeline.chains, 1);
    assert_eq!(
        sink.chains[0].frames,
        vec!["Lib.Danger::C()", "App.Impl::B()", "App.Api::A()"]
    );
    assert_eq!(sink.chains[0].category, "Lib");
    assert_eq!(sink.chains[0].annotation.to_string(), "Reflection: uses reflection");
    assert!(sink.finished);
}

// Scenario: B marked safe stops the search
#[test]
fn test_safe_intermediate_yields_nothing() {
    let program = abc_program();
    let mut annotations = warn_entry("Lib.Danger", "uses reflection");
    annotations.extend(entries(
        r#"[{ "Type": "App.Impl", "Methods": ["B"], "Aspect": "MemberTrimming", "Safe": "reviewed" }]"#,
    ));
    let analyzer = Analyzer::new(&program).annotation_entries(annotations);
    let (report, sink) = run(&analyzer);

    assert_eq!(report.pipeline.chains, 0);
    assert!(sink.chains.is_empty());
    assert_eq!(report.graph.safe_count, 1);
}

// Scenario: D virtual and annotated, E overrides D; E becomes interesting
#[test]
fn test_override_inherits_and_is_reported() {
    let program = ProgramGraph {
        methods: vec![
            method("d", "Lib.Base", "D", false, true),
            method("e", "Lib.Derived", "E", false, false),
            method("p", "App.Api", "P", true, false),
        ],
        edges: vec![edge("p", "e")],
        overrides: vec![edge("d", "e")],
        ..ProgramGraph::default()
    };
    let analyzer = Analyzer::new(&program)
        .annotation_entries(warn_entry("Lib.Base", "dispatches by name"))
        .grouping(Grouping::None);
    let prepared = analyzer.prepare().unwrap();

    let e = prepared.space.index_of(&MethodId::new("e")).unwrap();
    assert!(prepared.graph.is_interesting(e));
    assert_eq!(prepared.propagation.applied, 1);
    assert_eq!(
        prepared.model.annotation(e).map(|a| a.to_string()),
        Some("Reflection: dispatches by name".to_string())
    );

    let mut sink = MemorySink::new();
    let report = analyzer.run_prepared(&prepared, &mut sink).unwrap();
    // D is virtual, therefore an entry: it is exposed, not a chain.
    assert_eq!(report.pipeline.exposed_sources, vec!["Lib.Base::D()".to_string()]);
    assert_eq!(sink.chains.len(), 1);
    assert_eq!(sink.chains[0].frames, vec!["Lib.Derived::E()", "App.Api::P()"]);
}

// Scenario: F has two unresolved call sites and one destination G
#[test]
fn test_unanalyzed_call_sites_each_get_a_chain() {
    let program = ProgramGraph {
        methods: vec![
            method("f", "Lib.Loader", "F", false, false),
            method("g", "App.Api", "G", true, false),
            method("gettype", "System.Type", "GetType", true, false),
            method("invoke", "System.Reflection.MethodBase", "Invoke", true, false),
        ],
        edges: vec![edge("g", "f"), edge("f", "gettype"), edge("f", "invoke")],
        reflection: ReflectionInput {
            recognized: Vec::new(),
            unrecognized: vec![
                UnrecognizedCall {
                    caller: MethodId::new("f"),
                    reflection_method: MethodId::new("gettype"),
                    aspect: Aspect::TypeTrimming,
                    message: "GetType with a non-constant name".into(),
                    category: None,
                },
                UnrecognizedCall {
                    caller: MethodId::new("f"),
                    reflection_method: MethodId::new("invoke"),
                    aspect: Aspect::MemberTrimming,
                    message: "Invoke on an unknown method".into(),
                    category: Some("Invocation".into()),
                },
            ],
        },
        ..ProgramGraph::default()
    };
    let (report, sink) = run(&Analyzer::new(&program).grouping(Grouping::None));

    assert_eq!(report.unanalyzed_methods, 1);
    assert_eq!(sink.chains.len(), 2);
    let messages: BTreeSet<String> = sink.chains.iter().map(|c| c.annotation.to_string()).collect();
    assert_eq!(
        messages,
        BTreeSet::from([
            "LinkerUnanalyzed: GetType with a non-constant name".to_string(),
            "Invocation: Invoke on an unknown method".to_string(),
        ])
    );
    for chain in &sink.chains {
        assert_eq!(chain.frames.last().map(String::as_str), Some("App.Api::G()"));
        assert_eq!(chain.frames[1], "Lib.Loader::F()");
    }
}

#[test]
fn test_recognized_reflection_call_is_not_a_finding() {
    // R is a dangerous reflection API called by X (resolved) and Y (not).
    let program = ProgramGraph {
        methods: vec![
            method("r", "System.Type", "GetMethod", false, false),
            method("x", "App.Good", "X", true, false),
            method("y", "App.Bad", "Y", true, false),
        ],
        edges: vec![edge("x", "r"), edge("y", "r")],
        reflection: ReflectionInput {
            recognized: vec![RecognizedCall {
                caller: MethodId::new("x"),
                reflection_method: MethodId::new("r"),
            }],
            unrecognized: Vec::new(),
        },
        ..ProgramGraph::default()
    };
    let analyzer = Analyzer::new(&program)
        .annotation_entries(warn_entry("System.Type", "member lookup by name"))
        .grouping(Grouping::None);
    let (report, sink) = run(&analyzer);

    assert_eq!(report.resolved_reflection_calls, 1);
    assert_eq!(sink.chains.len(), 1);
    assert_eq!(sink.chains[0].frames, vec!["System.Type::GetMethod()", "App.Bad::Y()"]);
}

#[test]
fn test_suppressed_source_not_reported() {
    let program = abc_program();
    let analyzer = Analyzer::new(&program).annotation_entries(entries(
        r#"[{ "Type": "Lib.Danger", "Methods": ["C"], "Aspect": "MemberTrimming", "Suppress": "known" }]"#,
    ));
    let (report, sink) = run(&analyzer);
    assert_eq!(report.pipeline.chains, 0);
    assert_eq!(report.pipeline.suppressed, 1);
    assert!(sink.chains.is_empty());
}

#[test]
fn test_annotation_files_from_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("lib.analysisconfig.jsonc"),
        r#"[
            // the only dangerous method in this program
            { "Type": "Lib.Danger", "Methods": ["C()"], "Aspect": "TypeTrimming", "Warn": "from file" }
        ]"#,
    )
    .unwrap();

    let program = abc_program();
    let (report, sink) = run(&Analyzer::new(&program).annotation_files([dir.path()]));
    assert_eq!(report.annotations.annotated, 1);
    assert_eq!(sink.chains.len(), 1);
    assert_eq!(sink.chains[0].annotation.category(), annotations::DEFAULT_CATEGORY);
}

#[test]
fn test_malformed_annotation_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.analysisconfig.json");
    fs::write(
        &path,
        r#"[{ "Type": "Lib.Danger", "Methods": ["*"], "Aspect": "TypeTrimming", "Warn": "w", "Suppress": "s" }]"#,
    )
    .unwrap();

    let program = abc_program();
    let err = Analyzer::new(&program)
        .annotation_files([path])
        .run(MemorySink::new())
        .unwrap_err();
    assert!(matches!(err, TrimreachError::Config { .. }));
}

#[test]
fn test_cancelled_run_returns_cancelled() {
    let program = abc_program();
    let token = CancellationToken::new();
    token.cancel();
    let err = Analyzer::new(&program)
        .annotation_entries(warn_entry("Lib.Danger", "x"))
        .cancellation(token)
        .run(MemorySink::new())
        .unwrap_err();
    assert!(matches!(err, TrimreachError::Cancelled));
}

/// Fires the run's token as soon as the first chain is written.
struct CancellingSink {
    token: CancellationToken,
    inner: MemorySink,
}

impl ChainSink for CancellingSink {
    fn chain(&mut self, chain: &ReportedChain) -> TrimreachResult<()> {
        self.token.cancel();
        self.inner.chain(chain)
    }
}

#[test]
fn test_cancel_during_grouped_output_is_not_a_clean_run() {
    // Grouped chains are written after the completion signal, past the
    // consumer's last cancellation check.
    let program = abc_program();
    let token = CancellationToken::new();
    let sink = CancellingSink {
        token: token.clone(),
        inner: MemorySink::new(),
    };
    let err = Analyzer::new(&program)
        .annotation_entries(warn_entry("Lib.Danger", "x"))
        .grouping(Grouping::Callee)
        .cancellation(token.clone())
        .run(sink)
        .unwrap_err();

    assert!(matches!(err, TrimreachError::Cancelled));
    assert!(token.is_cancelled());
}

#[test]
fn test_json_sink_end_to_end() {
    let program = abc_program();
    let analyzer = Analyzer::new(&program)
        .annotation_entries(warn_entry("Lib.Danger", "uses reflection"))
        .grouping(Grouping::Caller);
    let mut out = Vec::new();
    analyzer.run(JsonSink::new(&mut out)).unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc[0]["group"], "App.Api::A()");
    assert_eq!(doc[0]["count"], 1);
    assert_eq!(doc[0]["chains"][0]["frames"][2], "App.Api::A()");
}

#[test]
fn test_report_serializes_with_timestamp() {
    let program = abc_program();
    let (report, _) = run(&Analyzer::new(&program).annotation_entries(warn_entry("Lib.Danger", "x")));
    let value = serde_json::to_value(&report).unwrap();
    assert!(value["generated_at"].is_string());
    assert_eq!(value["grouping"], "callee");
    assert_eq!(value["pipeline"]["chains"], 1);
    assert!(report
        .summary_lines()
        .contains(&"found 1 stack traces".to_string()));
}

// ----------------------------------------------------------------------------
// Properties over a generated graph
// ----------------------------------------------------------------------------

/// Deterministic pseudo-random program: 80 methods, one type each.
fn generated_program() -> (ProgramGraph, Vec<AnnotationEntry>) {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let n = 80;
    let mut program = ProgramGraph::default();
    let mut config = Vec::new();
    for i in 0..n {
        let roll = next() % 100;
        let public = roll < 15;
        let virt = (15..20).contains(&roll);
        program
            .methods
            .push(method(&format!("m{}", i), &format!("Gen.T{}", i), "M", public, virt));
        match next() % 10 {
            0 | 1 => config.push(format!(
                r#"{{ "Type": "Gen.T{}", "Methods": ["*"], "Aspect": "MemberTrimming", "Warn": "w{}" }}"#,
                i, i
            )),
            2 => config.push(format!(
                r#"{{ "Type": "Gen.T{}", "Methods": ["*"], "Aspect": "MemberTrimming", "Safe": "s{}" }}"#,
                i, i
            )),
            _ => {}
        }
    }
    for _ in 0..240 {
        let caller = next() % n;
        let callee = next() % n;
        program
            .edges
            .push(edge(&format!("m{}", caller), &format!("m{}", callee)));
    }
    let entries = entries(&format!("[{}]", config.join(",")));
    (program, entries)
}

#[test]
fn test_chain_endpoints_and_interior() {
    let (program, annotations) = generated_program();
    let analyzer = Analyzer::new(&program)
        .annotation_entries(annotations)
        .grouping(Grouping::None);
    let prepared = analyzer.prepare().unwrap();
    let mut sink = MemorySink::new();
    analyzer.run_prepared(&prepared, &mut sink).unwrap();
    let g = &prepared.graph;

    for chain in &sink.chains {
        let nodes = &chain.nodes;
        assert!(nodes.len() >= 2, "zero-length chain reported");
        assert!(nodes.iter().all(|&n| !g.is_safe(n)), "safe node in {:?}", nodes);
        assert!(g.is_interesting(nodes[0]));
        assert!(g.is_entry(nodes[nodes.len() - 1]));
        for &inner in &nodes[1..nodes.len() - 1] {
            assert!(!g.is_entry(inner));
            assert!(!g.is_interesting(inner));
        }
        for pair in nodes.windows(2) {
            assert!(g.callers(pair[0]).contains(&pair[1]), "not an edge: {:?}", pair);
        }
        let distinct: BTreeSet<_> = nodes.iter().collect();
        assert_eq!(distinct.len(), nodes.len());
    }
}

#[test]
fn test_reported_chains_are_deterministic() {
    let (program, annotations) = generated_program();
    let collect = || {
        let analyzer = Analyzer::new(&program)
            .annotation_entries(annotations.clone())
            .grouping(Grouping::None);
        let (_, sink) = run(&analyzer);
        sink.chains
            .iter()
            .map(ReportedChain::key)
            .collect::<BTreeSet<_>>()
    };
    let first = collect();
    for _ in 0..3 {
        assert_eq!(collect(), first);
    }
}

#[test]
fn test_grouped_and_ungrouped_report_same_chains() {
    let (program, annotations) = generated_program();
    let keys = |grouping| {
        let analyzer = Analyzer::new(&program)
            .annotation_entries(annotations.clone())
            .grouping(grouping);
        let (report, sink) = run(&analyzer);
        assert_eq!(report.pipeline.chains, sink.chains.len());
        sink.chains
            .iter()
            .map(ReportedChain::key)
            .collect::<BTreeSet<_>>()
    };
    let flat = keys(Grouping::None);
    assert_eq!(keys(Grouping::Callee), flat);
    assert_eq!(keys(Grouping::Caller), flat);
    assert_eq!(keys(Grouping::ImmediateCaller), flat);
}

#[test]
fn test_propagation_reaches_fixed_point_in_prepare() {
    let program = ProgramGraph {
        methods: vec![
            method("base", "Lib.Base", "M", false, true),
            method("mid", "Lib.Mid", "M", false, true),
            method("leaf", "Lib.Leaf", "M", false, true),
        ],
        overrides: vec![edge("base", "mid"), edge("mid", "leaf")],
        ..ProgramGraph::default()
    };
    let analyzer = Analyzer::new(&program).annotation_entries(warn_entry("Lib.Base", "x"));
    let mut prepared = analyzer.prepare().unwrap();
    assert_eq!(prepared.propagation.applied, 2);

    let overrides = OverrideIndex::from_pairs(&prepared.space, &program.overrides);
    let again = prepared
        .model
        .propagate_overrides(&overrides, &prepared.graph.flags().is_virtual);
    assert_eq!(again.changed(), 0);
}

#[test]
fn test_program_graph_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.json");
    let program = abc_program();
    fs::write(&path, serde_json::to_string(&program).unwrap()).unwrap();
    assert_eq!(ProgramGraph::load(&path).unwrap(), program);
}
