// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing::info;

use url_risk_scanner::config::load_rules;
use url_risk_scanner::{AnalyzerConfig, UrlAnalyzer, logging};

/// Scores a URL for phishing and malware risk and prints the report as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to analyze; the scheme may be omitted
    url: String,

    /// Threat-intel aggregation endpoint (overrides URL_RISK_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Deadline for the remote lookup in seconds (overrides URL_RISK_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<String>,

    /// JSON rule-table file (overrides URL_RISK_RULES_FILE)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print the report on one line instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_path = logging::initialize_logging()?;
    info!(log = %log_path.display(), "Logging initialized.");

    let mut config = AnalyzerConfig::from_env().wrap_err("invalid configuration")?;
    if let Some(endpoint) = &args.endpoint {
        config = config.with_endpoint(endpoint)?;
    }
    if let Some(secs) = &args.timeout_secs {
        config = config.with_timeout_secs(secs)?;
    }
    if let Some(path) = &args.rules {
        config.rules = load_rules(path)?;
    }

    let analyzer = UrlAnalyzer::from_config(&config)?;
    let report = analyzer.analyze(&args.url).await;

    let rendered = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");
    Ok(())
}
