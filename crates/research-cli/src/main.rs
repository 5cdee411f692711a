//! Command-line interface for the stock research orchestrator
//!
//! # Usage
//!
//! ```bash
//! # Point at any OpenAI-compatible endpoint
//! export OPENAI_API_BASE="http://localhost:1234/v1"
//! export OPENAI_MODEL="your-model-name"
//!
//! research analyze "Compare NVDA, AMD, and TSM for AI datacenter demand"
//! research tickers "Analyze AAPL and MSFT for growth potential"
//! research agents
//! ```

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use research_core::AgentKind;
use research_engine::{
    AgentRoster, AnalysisResult, ErrorKind, Orchestrator, ResearchConfig, ResearchError,
    TickerExtractor, TickerInsight,
};
use research_llm::providers::{OpenAIConfig, OpenAIProvider};
use research_utils::{LogFormat, env_string, init_tracing};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_API_BASE: &str = "http://localhost:1234/v1";

#[derive(Parser, Debug)]
#[command(name = "research")]
#[command(about = "Multi-agent stock research from natural-language queries", long_about = None)]
struct Args {
    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research every ticker mentioned in a query
    Analyze {
        /// Natural-language query, e.g. "Analyze AAPL and MSFT"
        query: String,

        /// End-to-end budget in seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Attempts per agent before giving up
        #[arg(long)]
        max_iterations: Option<u32>,

        /// OpenAI-compatible API base URL (defaults to `OPENAI_API_BASE`)
        #[arg(long)]
        api_base: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which tickers a query would research
    Tickers {
        query: String,
    },

    /// List the research agents and their capabilities
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.log_format);

    match args.command {
        Command::Analyze {
            query,
            timeout,
            max_iterations,
            api_base,
            json,
        } => analyze(query, timeout, max_iterations, api_base, json).await,
        Command::Tickers { query } => {
            let tickers = TickerExtractor::new().extract(&query);
            if tickers.is_empty() {
                eprintln!("{}", ResearchError::NoTickersFound);
                return Ok(exit_code(ErrorKind::Validation));
            }
            println!("{}", tickers.into_iter().collect::<Vec<_>>().join(" "));
            Ok(ExitCode::SUCCESS)
        }
        Command::Agents => {
            print_agents();
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn analyze(
    text: String,
    timeout: Option<f64>,
    max_iterations: Option<u32>,
    api_base: Option<String>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let config = ResearchConfig::from_env()?;
    let api_base = api_base
        .or_else(|| env_string("OPENAI_API_BASE"))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let api_key = env_string("OPENAI_API_KEY").unwrap_or_else(|| "not-needed".to_string());
    let provider_config = OpenAIConfig::new(api_key)
        .with_api_base(api_base)
        .with_timeout(config.agent_timeout.as_secs().max(1));
    info!(api_base = %provider_config.api_base, model = %config.model, "Using provider");

    let provider = Arc::new(OpenAIProvider::with_config(provider_config)?);
    let roster = AgentRoster::llm_backed(provider, &config)?;
    let orchestrator = Orchestrator::new(roster, config.clone());

    let mut query = config.query(text);
    if let Some(seconds) = timeout {
        query = query.with_timeout_secs(seconds);
    }
    if let Some(iterations) = max_iterations {
        query = query.with_max_iterations(iterations);
    }

    // Ctrl-C cancels the request instead of killing the process
    let request_id = Orchestrator::new_request_id();
    let watcher = {
        let orchestrator = orchestrator.clone();
        let request_id = request_id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling analysis");
                let _ = orchestrator.cancel(&request_id);
            }
        })
    };

    let outcome = orchestrator
        .start_analysis_with_id(&request_id, query)
        .await;
    watcher.abort();

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Ok(exit_code(err.kind()))
        }
    }
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => ExitCode::from(2),
        ErrorKind::Timeout => ExitCode::from(3),
        ErrorKind::Cancelled => ExitCode::from(130),
        ErrorKind::Internal => ExitCode::FAILURE,
    }
}

fn print_agents() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Agent", "Description", "Capabilities"]);

    for kind in AgentKind::RESEARCH.into_iter().chain([AgentKind::Synthesis]) {
        table.add_row(vec![
            kind.as_str().to_string(),
            kind.description().to_string(),
            kind.capabilities().join(", "),
        ]);
    }
    println!("{table}");
}

fn print_result(result: &AnalysisResult) {
    println!(
        "Request {} analyzed {} in {:.1}s\n",
        result.request_id,
        result.tickers_analyzed.join(", "),
        result.total_latency_ms / 1000.0
    );

    for insight in &result.insights {
        print_insight(insight);
    }
}

fn print_insight(insight: &TickerInsight) {
    println!(
        "== {} ({}) : {:?}, {:?} confidence ==",
        insight.ticker, insight.company_name, insight.stance, insight.confidence
    );
    println!("{}\n", insight.summary);
    println!("Rationale: {}\n", insight.rationale);

    for (label, items) in [
        ("Key drivers", &insight.key_drivers),
        ("Risks", &insight.risks),
        ("Catalysts", &insight.catalysts),
        ("Sources", &insight.sources),
    ] {
        if items.is_empty() {
            continue;
        }
        println!("{label}:");
        for item in items {
            println!("  - {item}");
        }
    }

    let mut traces = Table::new();
    traces
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Agent", "Status", "Attempts", "Latency (ms)", "Error"]);
    for trace in &insight.agent_traces {
        traces.add_row(vec![
            trace.agent_type.to_string(),
            format!("{:?}", trace.status),
            trace.attempts.to_string(),
            format!("{:.0}", trace.latency_ms),
            trace.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{traces}\n");
}
