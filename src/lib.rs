//! URL risk scanner.
//!
//! Scores an arbitrary URL by combining fast local heuristics with a single,
//! time-bounded call to a remote threat-intelligence aggregation service, and
//! reduces everything into one risk tier plus an itemized list of findings.
//!
//! ```no_run
//! # async fn run() -> Result<(), url_risk_scanner::core::errors::ConfigError> {
//! use url_risk_scanner::{AnalyzerConfig, UrlAnalyzer};
//!
//! let analyzer = UrlAnalyzer::from_config(&AnalyzerConfig::from_env()?)?;
//! let report = analyzer.analyze("http://secure-paypal-login.tk").await;
//! println!("{} ({})", report.tier, report.score);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::AnalyzerConfig;
pub use crate::core::models::{AnalysisReport, Finding, RiskTier};
pub use crate::core::scanner::UrlAnalyzer;
pub use crate::core::scanner::threat_intel::{ThreatIntelClient, ThreatIntelSource};
