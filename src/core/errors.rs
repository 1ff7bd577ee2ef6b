//! Error types for the analysis pipeline.
//!
//! None of these escape `UrlAnalyzer::analyze`; they are turned into findings
//! by the orchestrator. They are public so the individual stages can be used
//! and tested on their own.

use std::time::Duration;
use thiserror::Error;

/// The raw input could not be turned into a URL with a host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid URL {input:?}: {reason}")]
pub struct InvalidUrl {
    pub input: String,
    pub reason: String,
}

/// Failures of the single outbound threat-intel call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreatIntelError {
    #[error("threat-intel request timed out after {}s", .after.as_secs_f32())]
    Timeout { after: Duration },

    #[error("threat-intel service unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("threat-intel service error (HTTP {status}): {message}")]
    RemoteError { status: u16, message: String },
}

/// Problems building an `AnalyzerConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("could not read rule file {path}: {source}")]
    RuleFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse rule file {path}: {source}")]
    RuleFileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
