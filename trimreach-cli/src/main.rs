//! trimreach CLI - finds call chains from trim-unsafe methods to public API.
//!
//! Features:
//! - Loads a program graph exported by the graph builder (JSON)
//! - Annotation configuration files or directories (`*.analysisconfig.json`)
//! - Rayon-powered parallel searches with a streaming report
//! - Text or JSON output, optionally grouped
//! - Optional `trimreach.toml` next to the graph

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use trimreach_core::{
    init_structured_logging, load_config, load_config_file, log_error, log_info, log_warn,
    AnalysisReport, Analyzer, ChainSink, Grouping, JsonSink, ProgramGraph, SearchConfig, TextSink,
    TrimreachConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trimming-readiness reachability analysis")]
pub struct Cli {
    /// Program graph JSON produced by the graph builder
    graph: PathBuf,

    /// Annotation configuration file or directory (repeatable)
    #[arg(long = "annotations", value_name = "PATH")]
    annotations: Vec<PathBuf>,

    /// Configuration file (default: trimreach.toml next to the graph)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Grouping: none, caller, immediate-caller or callee
    #[arg(long = "group", value_name = "MODE")]
    group: Option<String>,

    /// Destinations collected per dangerous method (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_destinations: Option<usize>,

    /// Stop each search at its first entry method
    #[arg(long)]
    first_only: bool,

    /// Write the chain report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the run summary (JSON with --json; stdout when --output is set)
    #[arg(long)]
    summary: bool,
}

/// Settings after merging the config file under command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    annotations: Vec<PathBuf>,
    search: SearchConfig,
    grouping: Grouping,
    json: bool,
}

fn merge_settings(cli: &Cli, cfg: Option<TrimreachConfig>, base: &Path) -> Result<Settings> {
    let cfg = cfg.unwrap_or_default();
    let report = cfg.report.clone().unwrap_or_default();

    let mut annotations = cfg.annotation_paths(base);
    annotations.extend(cli.annotations.iter().cloned());

    let mut search = cfg.search.clone().unwrap_or_default();
    if cli.max_destinations.is_some() {
        search.max_destinations = cli.max_destinations;
    }
    if cli.first_only {
        search.first_only = Some(true);
    }

    let grouping = match cli.group.as_deref().or(report.grouping.as_deref()) {
        Some(name) => name.parse::<Grouping>()?,
        None => Grouping::default(),
    };

    let json = cli.json || report.format.as_deref() == Some("json");

    Ok(Settings {
        annotations,
        search,
        grouping,
        json,
    })
}

fn load_settings_config(cli: &Cli, base: &Path) -> Result<Option<TrimreachConfig>> {
    if let Some(path) = &cli.config {
        return load_config_file(path).map(Some);
    }
    // A broken optional config is reported but does not stop the run.
    match load_config(base) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            log_warn(&format!("config load failed: {:#}", e));
            Ok(None)
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Failed to create {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn print_summary(report: &AnalysisReport, json: bool, to_stdout: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("Failed to encode summary")?;
        if to_stdout {
            println!("{}", text);
        } else {
            eprintln!("{}", text);
        }
    } else {
        for line in report.summary_lines() {
            eprintln!("{}", line);
        }
    }
    Ok(())
}

fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] trimreach internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
    }));

    // Initialize structured logging (JSON to stderr, respects RUST_LOG)
    init_structured_logging();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(has_findings) => std::process::exit(if has_findings { 1 } else { 0 }),
        Err(e) => {
            log_error(&format!("{:#}", e));
            eprintln!("[ERROR] {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Runs the analysis; returns whether any chain was reported.
fn run(cli: &Cli) -> Result<bool> {
    let base = cli
        .graph
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let cfg = load_settings_config(cli, &base)?;
    let settings = merge_settings(cli, cfg, &base)?;

    let program = ProgramGraph::load(&cli.graph)
        .with_context(|| format!("Failed to load program graph: {}", cli.graph.display()))?;

    let analyzer = Analyzer::new(&program)
        .annotation_files(settings.annotations.iter().cloned())
        .search_options(settings.search.to_options())
        .grouping(settings.grouping);

    let out = open_output(cli.output.as_deref())?;
    let mut sink: Box<dyn ChainSink + Send> = if settings.json {
        Box::new(JsonSink::new(out))
    } else {
        Box::new(TextSink::new(out))
    };

    let report = analyzer.run(&mut *sink).context("Analysis failed")?;
    drop(sink);

    log_info(&format!(
        "{} chains from {} searches",
        report.pipeline.chains, report.searches
    ));

    if cli.summary {
        // Without --output, stdout already holds the chain report.
        print_summary(&report, settings.json, cli.output.is_some())?;
    }

    Ok(report.has_findings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use trimreach_core::SearchOptions;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["trimreach"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_without_config() {
        let c = cli(&["graph.json"]);
        let s = merge_settings(&c, None, Path::new(".")).unwrap();
        assert_eq!(s.grouping, Grouping::Callee);
        assert!(!s.json);
        assert!(s.annotations.is_empty());
        assert_eq!(s.search.to_options(), SearchOptions::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cfg: TrimreachConfig = toml::from_str(
            r#"
annotations = ["base.analysisconfig.json"]
[search]
max_destinations = 3
[report]
grouping = "caller"
format = "json"
"#,
        )
        .unwrap();
        let c = cli(&[
            "graph.json",
            "--group",
            "none",
            "--max-destinations",
            "0",
            "--first-only",
            "--annotations",
            "extra",
        ]);
        let s = merge_settings(&c, Some(cfg), Path::new("/work")).unwrap();

        assert_eq!(s.grouping, Grouping::None);
        assert!(s.json);
        assert_eq!(
            s.annotations,
            vec![
                PathBuf::from("/work/base.analysisconfig.json"),
                PathBuf::from("extra")
            ]
        );
        let options = s.search.to_options();
        assert_eq!(options.max_destinations, None);
        assert!(!options.return_multiple);
    }

    #[test]
    fn test_unknown_grouping_is_rejected() {
        let c = cli(&["graph.json", "--group", "diagonal"]);
        assert!(merge_settings(&c, None, Path::new(".")).is_err());
    }

    #[test]
    fn test_explicit_config_file_errors_are_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[search\n").unwrap();
        let c = cli(&["graph.json", "--config", path.to_str().unwrap()]);
        assert!(load_settings_config(&c, dir.path()).is_err());
    }

    #[test]
    fn test_broken_implicit_config_is_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("trimreach.toml"), "[search\n").unwrap();
        let c = cli(&["graph.json"]);
        assert!(load_settings_config(&c, dir.path()).unwrap().is_none());
    }
}
