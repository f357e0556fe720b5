//! CLI definition and command dispatch for crag.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--threshold`, `--top-k`, `--config`)
//! 2. Environment variables (`CRAG_CONFIG`, `CRAG_VERBOSE`, `CRAG_COLOR`)
//! 3. Config file (`~/.crag/config.yaml` or path from `--config`/`CRAG_CONFIG`)
//! 4. Built-in defaults

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::ui::{format, table, tree, ColorMode, MessageType, Progress, ProgressMode, Style};

use crag_core::{
    load_resolution_log, CragConfig, CragEngine, CragError, Query, ResolutionLogEntry,
    ResolutionOutcome, ResolutionRequest, SearchProviderKind, TraceNode, CRAG_HOME_DIR,
    RESOLUTION_LOG_FILENAME,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CRAG_GIT_HASH"), ")");

/// Corrective Retrieval Gate – decide when retrieved evidence needs a web fallback
#[derive(Parser, Debug)]
#[command(name = "crag")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "CRAG_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and warnings
    #[arg(short, long, global = true, env = "CRAG_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.crag/config.yaml)
    #[arg(long, global = true, env = "CRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, env = "CRAG_COLOR", value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Gate one query's retrieved evidence and fall back to web search if needed
    #[command(after_help = r#"EXAMPLES:
    # Retrieval output from a file
    crag resolve "What is Allstate's claims number?" --input retrieval.txt

    # Retrieval output from stdin
    my-retriever "claims number" | crag resolve "What is Allstate's claims number?"

    # Stricter gate, show the decision trace
    crag resolve "claims number" -i retrieval.txt --threshold 0.7 --tree

    # Machine-readable output
    crag resolve "claims number" -i retrieval.txt --json | jq '.decision'

    # Mermaid flowchart of the cycle
    crag resolve "claims number" -i retrieval.txt --mermaid
"#)]
    Resolve {
        /// The user's question, passed to the judge and the search unchanged
        query: String,

        /// File with the primary retrieval output (`Score: ...` / `Content: ...`); `-` reads stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Override `gate.minimum_relevance_score`
        #[arg(long)]
        threshold: Option<f32>,

        /// Override `fallback.top_k_fallback_results`
        #[arg(long)]
        top_k: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Output in pretty-printed JSON format
        #[arg(long, conflicts_with = "json")]
        pretty: bool,

        /// Include the decision trace as a tree
        #[arg(long)]
        tree: bool,

        /// Print the decision trace as a Mermaid flowchart only
        #[arg(long, conflicts_with_all = ["json", "pretty", "tree"])]
        mermaid: bool,
    },

    /// Resolve many queries from a JSONL file in parallel
    #[command(after_help = r#"EXAMPLES:
    # One request per line: {"query": "...", "retrieval": "Score: ...\nContent: ..."}
    crag batch requests.jsonl

    # One JSON summary per line, in input order
    crag batch requests.jsonl --json > outcomes.jsonl
"#)]
    Batch {
        /// JSONL file of `{"query", "retrieval"}` requests; `-` reads stdin
        #[arg(default_value = "-")]
        file: String,

        /// Override `gate.minimum_relevance_score`
        #[arg(long)]
        threshold: Option<f32>,

        /// Override `fallback.top_k_fallback_results`
        #[arg(long)]
        top_k: Option<usize>,

        /// Output one JSON summary per line
        #[arg(long)]
        json: bool,
    },

    /// Show recent entries of the resolution log
    #[command(after_help = r#"EXAMPLES:
    # Requires `log.resolution_log` in the config
    crag log

    # Last 5 resolutions as JSON
    crag log --limit 5 --json
"#)]
    Log {
        /// Show only the most recent N entries
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage crag configuration (validate, show resolved config)
    #[command(after_help = r#"EXAMPLES:
    # Validate configuration
    crag config check

    # Show resolved configuration as JSON
    crag config show --json
"#)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (file merged with defaults)
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` when a
/// command fails or a resolution cycle ends in `failed`.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always, debug with --verbose, errors only with --quiet.
    // Logs go to stderr so JSON on stdout stays parseable.
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = format!(
        "crag_core={lvl},crag_cli={lvl},crag_model={lvl},crag_search={lvl}",
        lvl = log_level
    );

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Command::Resolve {
            query,
            input,
            threshold,
            top_k,
            json,
            pretty,
            tree,
            mermaid,
        } => {
            let Some(engine) = open_engine(&style, config_path, threshold, top_k) else {
                return ExitCode::FAILURE;
            };
            let output = ResolveOutputMode {
                json,
                pretty,
                tree,
                mermaid,
            };
            handle_resolve(&style, &engine, query, &input, output, cli.quiet)
        }
        Command::Batch {
            file,
            threshold,
            top_k,
            json,
        } => {
            let Some(engine) = open_engine(&style, config_path, threshold, top_k) else {
                return ExitCode::FAILURE;
            };
            handle_batch(&style, &engine, &file, json, cli.quiet)
        }
        Command::Log { limit, json } => handle_log(&style, config_path, limit, json),
        Command::Config { action } => handle_config(&style, config_path, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration, apply flag overrides and build the engine.
/// Prints the failure with a hint and returns `None` on error.
fn open_engine(
    style: &Style,
    config_path: Option<&Path>,
    threshold: Option<f32>,
    top_k: Option<usize>,
) -> Option<CragEngine> {
    let engine = load_config(config_path).and_then(|mut config| {
        tracing::debug!(
            "Config loaded from {}",
            config_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "~/.crag/config.yaml".to_string())
        );
        if let Some(t) = threshold {
            config = config.with_threshold(t);
        }
        if let Some(k) = top_k {
            config = config.with_top_k(k);
        }
        CragEngine::from_config(config.validated()?)
    });

    match engine {
        Ok(engine) => Some(engine),
        Err(e) => {
            let hint = engine_hint(&e, config_path);
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize crag engine",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            None
        }
    }
}

/// Parse the config file; validation waits until flag overrides are applied.
fn load_config(config_path: Option<&Path>) -> Result<CragConfig, CragError> {
    match config_path {
        Some(path) => CragConfig::read_path(path),
        None => CragConfig::read_default(),
    }
}

fn engine_hint(err: &CragError, config_path: Option<&Path>) -> String {
    match err {
        CragError::ProviderUnavailable { provider, .. } if provider == "tavily" => {
            "Export the search API key, or set `search.provider: none` to run without fallback"
                .to_string()
        }
        CragError::GateMisconfiguration(_) => {
            "Use --threshold or `gate.minimum_relevance_score` with a value in [0, 1]".to_string()
        }
        _ => match config_path {
            Some(path) => format!("Check your config at {}", path.display()),
            None => "Check your config at ~/.crag/config.yaml".to_string(),
        },
    }
}

/// Read a file, or stdin when `source` is `-`.
fn read_source(source: &str) -> Result<String, CragError> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CragError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        return Ok(buf);
    }

    std::fs::read_to_string(source)
        .map_err(|e| CragError::InvalidArgument(format!("Failed to read {}: {}", source, e)))
}

// ============================================================================
// Command handlers
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ResolveOutputMode {
    json: bool,
    pretty: bool,
    tree: bool,
    mermaid: bool,
}

impl ResolveOutputMode {
    fn machine_readable(&self) -> bool {
        self.json || self.pretty || self.mermaid
    }
}

/// `--json` shape of `crag resolve`: the log entry plus the optional tree.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOutput {
    #[serde(flatten)]
    entry: ResolutionLogEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<TraceNode>,
}

fn handle_resolve(
    style: &Style,
    engine: &CragEngine,
    query: String,
    input: &str,
    output: ResolveOutputMode,
    quiet: bool,
) -> Result<(), CragError> {
    let raw = read_source(input)?;

    let progress = Progress::spinner(
        "Resolving query...",
        ProgressMode::detect(quiet, output.machine_readable()),
    );
    let outcome = engine.resolve(Query::new(query), &raw);
    progress.finish_clear();

    if output.mermaid {
        println!("{}", outcome.trace().to_mermaid());
    } else if output.json || output.pretty {
        let result = ResolveOutput {
            entry: ResolutionLogEntry::from_outcome(&outcome),
            tree: output.tree.then(|| outcome.trace().to_tree()),
        };
        let text = if output.pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{}", text);
    } else {
        print_resolution(style, engine, &outcome, output.tree, quiet);
    }

    outcome.into_result().map(|_| ())
}

fn print_resolution(
    style: &Style,
    engine: &CragEngine,
    outcome: &ResolutionOutcome,
    show_tree: bool,
    quiet: bool,
) {
    let trace = outcome.trace();
    let threshold = engine.controller().config().threshold();

    println!("{}", style.section("RESOLUTION"));
    println!();
    println!("  {}", style.key_value("Query", trace.query().as_str()));

    if let Some(decision) = outcome.decision() {
        let cause = trace
            .gate_cause()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        println!(
            "  {}",
            style.key_value("Decision", &format!("{}{}", style.decision(decision), cause))
        );
    }

    let score = match trace.score() {
        Some(value) => style.score(value, threshold.value()),
        None if trace.scoring_failed() => "judge failed".to_string(),
        None => "-".to_string(),
    };
    println!(
        "  {}",
        style.key_value("Score", &format!("{} (threshold {})", score, threshold))
    );

    if let Some(evidence) = outcome.evidence() {
        println!(
            "  {}",
            style.key_value(
                "Evidence",
                &format!(
                    "{} primary + {} fallback",
                    evidence.count_from(crag_core::EvidenceSource::Primary),
                    evidence.count_from(crag_core::EvidenceSource::Fallback)
                )
            )
        );
        println!(
            "  {}",
            style.key_value("Elapsed", &format::format_elapsed_ms(trace.elapsed_ms()))
        );

        println!();
        println!("{}", style.section("EVIDENCE"));
        println!();
        let text_width = crate::ui::color::terminal_width().saturating_sub(24);
        println!("{}", table::render_evidence_table(evidence.units(), text_width));
    }

    if !quiet && outcome.is_done() {
        if trace.scoring_failed() {
            println!();
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    "Judge failed; evidence was treated as insufficient"
                )
            );
        }
        if trace.fallback_failed() {
            println!();
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    "Fallback search failed; answering from primary evidence only"
                )
            );
            if engine.config().search.provider == SearchProviderKind::None {
                println!(
                    "{}",
                    style.message(
                        MessageType::Hint,
                        "Fallback search is disabled (search.provider: none)"
                    )
                );
            }
        }
    }

    if show_tree {
        println!();
        println!("{}", style.section("TRACE"));
        println!();
        println!("{}", tree::render_trace_tree(&trace.to_tree(), style));
    }
}

fn handle_batch(
    style: &Style,
    engine: &CragEngine,
    file: &str,
    json: bool,
    quiet: bool,
) -> Result<(), CragError> {
    let content = read_source(file)?;
    let requests = parse_requests(&content)?;

    if requests.is_empty() {
        if !json {
            println!("{}", style.message(MessageType::Info, "No requests found."));
        }
        return Ok(());
    }

    let progress = Progress::spinner(
        &format!("Resolving {} queries...", requests.len()),
        ProgressMode::detect(quiet, json),
    );
    let outcomes = engine.resolve_batch(&requests);
    progress.finish_clear();

    let entries: Vec<ResolutionLogEntry> =
        outcomes.iter().map(ResolutionLogEntry::from_outcome).collect();
    let failed = outcomes.iter().filter(|o| !o.is_done()).count();

    if json {
        for entry in &entries {
            println!("{}", serde_json::to_string(entry)?);
        }
    } else {
        println!("{}", table::render_log_table(&entries));
        println!();

        let augmented = outcomes
            .iter()
            .filter(|o| matches!(o, ResolutionOutcome::Done(r) if r.augmented()))
            .count();
        let summary = format!(
            "Resolved {} of {} queries ({} augmented, {} failed)",
            outcomes.len() - failed,
            outcomes.len(),
            augmented,
            failed
        );
        let kind = if failed == 0 {
            MessageType::Ok
        } else {
            MessageType::Warn
        };
        println!("{}", style.message(kind, &summary));
    }

    if failed > 0 {
        return Err(CragError::InvalidArgument(format!(
            "{} of {} queries failed",
            failed,
            outcomes.len()
        )));
    }
    Ok(())
}

/// Parse JSONL requests. Blank lines are skipped.
fn parse_requests(content: &str) -> Result<Vec<ResolutionRequest>, CragError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                CragError::InvalidArgument(format!("Invalid request on line {}: {}", i + 1, e))
            })
        })
        .collect()
}

fn handle_log(
    style: &Style,
    config_path: Option<&Path>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), CragError> {
    let config = load_config(config_path)?;

    let Some(path) = config.resolution_log_path() else {
        if json {
            println!("[]");
        } else {
            println!(
                "{}",
                style.message(MessageType::Info, "Resolution logging is disabled.")
            );
            println!(
                "{}",
                style.message(
                    MessageType::Hint,
                    &format!(
                        "Set `log.resolution_log: ~/{}/{}` in your config to record resolutions",
                        CRAG_HOME_DIR, RESOLUTION_LOG_FILENAME
                    )
                )
            );
        }
        return Ok(());
    };

    let mut entries = if path.exists() {
        load_resolution_log(&path)?
    } else {
        Vec::new()
    };

    if let Some(limit) = limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("{}", style.message(MessageType::Info, "No resolutions logged yet."));
    } else {
        println!("{}", style.section("RESOLUTIONS"));
        println!();
        println!("{}", table::render_log_table(&entries));
    }

    Ok(())
}

fn handle_config(
    style: &Style,
    config_path: Option<&Path>,
    action: ConfigAction,
) -> Result<(), CragError> {
    match action {
        ConfigAction::Check { json } => handle_config_check(style, config_path, json),
        ConfigAction::Show { json } => handle_config_show(style, config_path, json),
    }
}

/// Result of `crag config check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigReport {
    path: Option<PathBuf>,
    exists: bool,
    valid: bool,
    warnings: Vec<String>,
    errors: Vec<String>,
}

fn check_config(path: Option<PathBuf>) -> ConfigReport {
    let mut report = ConfigReport {
        exists: path.as_deref().is_some_and(Path::exists),
        path,
        valid: true,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    let config = match report.path.as_deref().filter(|_| report.exists) {
        Some(path) => std::fs::read_to_string(path)
            .map_err(CragError::from)
            .and_then(|content| CragConfig::from_yaml(&content)),
        None => Ok(CragConfig::default()),
    };

    match config {
        Ok(config) => {
            match config.validate() {
                Ok(warnings) => report.warnings = warnings,
                Err(e) => report.errors.push(e.to_string()),
            }
            if config.search.provider == SearchProviderKind::Tavily
                && std::env::var_os(&config.search.api_key_env).is_none()
            {
                report.warnings.push(format!(
                    "search.api_key_env `{}` is not set; resolve will fail until it is",
                    config.search.api_key_env
                ));
            }
        }
        Err(e) => report.errors.push(e.to_string()),
    }

    report.valid = report.errors.is_empty();
    report
}

/// Validate the configuration file and report errors/warnings.
fn handle_config_check(
    style: &Style,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), CragError> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(CragConfig::default_path);
    let report = check_config(path);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let location = report
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<no home directory>".to_string());
        let status = if !report.exists {
            "-"
        } else if report.valid {
            "✓"
        } else {
            "✗"
        };
        println!(
            "{}",
            style.message(MessageType::Info, "Checked 1 configuration source")
        );
        println!("  {} config ({})", status, location);
        if !report.exists {
            println!("    not found, using defaults");
        }
        println!();

        if !report.warnings.is_empty() {
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    &format!("{} warning(s):", report.warnings.len())
                )
            );
            for warning in &report.warnings {
                println!("  • {}", warning);
            }
            println!();
        }

        if !report.errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Err, &format!("{} error(s):", report.errors.len()))
            );
            for error in &report.errors {
                println!("  • {}", error);
            }
            println!();
        }

        if report.valid && report.warnings.is_empty() {
            println!("{}", style.message(MessageType::Ok, "Configuration is valid"));
        } else if report.valid {
            println!(
                "{}",
                style.message(MessageType::Ok, "Configuration is valid with warnings")
            );
        } else {
            println!("{}", style.message(MessageType::Err, "Configuration has errors"));
        }
    }

    if !report.valid {
        return Err(CragError::InvalidConfiguration {
            message: format!("{} configuration error(s) found", report.errors.len()),
            hint: "Fix the errors listed above and run `crag config check` again".to_string(),
        });
    }

    Ok(())
}

/// Show the resolved configuration.
fn handle_config_show(
    style: &Style,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), CragError> {
    let config = load_config(config_path)?;

    if !json {
        println!("{}", style.message(MessageType::Info, "Resolved configuration:"));
        println!();
    }
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests_skips_blank_lines() {
        let content = r#"{"query": "a", "retrieval": "Content: x"}

{"query": "b", "retrieval": ""}
"#;
        let requests = parse_requests(content).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query.as_str(), "a");
        assert_eq!(requests[1].retrieval, "");
    }

    #[test]
    fn test_parse_requests_reports_line() {
        let err = parse_requests("{\"query\": \"a\", \"retrieval\": \"\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_engine_hint_for_missing_search_key() {
        let err = CragError::ProviderUnavailable {
            provider: "tavily".to_string(),
            reason: "environment variable `TAVILY_API_KEY` is not set".to_string(),
        };
        assert!(engine_hint(&err, None).contains("search.provider: none"));
    }

    #[test]
    fn test_check_missing_file_uses_defaults() {
        let report = check_config(Some(PathBuf::from("/nonexistent/crag/config.yaml")));
        assert!(!report.exists);
        assert!(report.valid);
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from([
            "crag", "resolve", "What?", "--input", "r.txt", "--threshold", "0.7", "--tree",
        ])
        .unwrap();
        match cli.command {
            Command::Resolve {
                query,
                input,
                threshold,
                tree,
                ..
            } => {
                assert_eq!(query, "What?");
                assert_eq!(input, "r.txt");
                assert_eq!(threshold, Some(0.7));
                assert!(tree);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_mermaid_conflicts_with_json() {
        let result = Cli::try_parse_from(["crag", "resolve", "q", "--mermaid", "--json"]);
        assert!(result.is_err());
    }
}
