// src/core/scanner/mod.rs

// This file acts as the public interface for the `scanner` module.
// It declares the three pipeline stages and wires them together.
pub mod aggregator;
pub mod heuristics;
pub mod threat_intel;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::config::AnalyzerConfig;
use crate::core::errors::{ConfigError, InvalidUrl};
use crate::core::knowledge_base::{RuleTables, recommendations_for};
use crate::core::models::{
    AnalysisReport, Finding, FindingCode, RemoteOutcome, RiskTier, ThresholdTable,
};
use crate::core::normalizer::normalize;
use self::aggregator::{ScoreAccumulator, aggregate_degraded, aggregate_remote};
use self::heuristics::run_heuristics;
use self::threat_intel::{ThreatIntelClient, ThreatIntelSource};

/// Evaluates URLs by combining local heuristics with remote threat intelligence.
///
/// The analyzer holds no per-request state: every call to [`analyze`] runs an
/// independent pipeline, so one instance can serve concurrent analyses.
///
/// [`analyze`]: UrlAnalyzer::analyze
#[derive(Debug, Clone)]
pub struct UrlAnalyzer<S = ThreatIntelClient> {
    source: S,
    rules: RuleTables,
}

impl UrlAnalyzer<ThreatIntelClient> {
    /// Builds an analyzer backed by the HTTP threat-intel client.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        let client = ThreatIntelClient::from_config(config)?;
        Ok(Self::new(client, config.rules.clone()))
    }
}

impl<S: ThreatIntelSource> UrlAnalyzer<S> {
    pub fn new(source: S, rules: RuleTables) -> Self {
        Self {
            source,
            rules: rules.normalized(),
        }
    }

    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }

    /// Runs the full pipeline for one raw input string.
    ///
    /// Never fails: malformed input yields a fixed high-risk report and a
    /// failed remote lookup yields a local-only report with a note saying so.
    #[instrument(skip(self), fields(rules_version = %self.rules.version))]
    pub async fn analyze(&self, raw: &str) -> AnalysisReport {
        self.analyze_at(raw, Utc::now()).await
    }

    /// Same as [`UrlAnalyzer::analyze`] with an explicit clock, used for the
    /// report timestamp and for domain-age calculations.
    pub async fn analyze_at(&self, raw: &str, now: DateTime<Utc>) -> AnalysisReport {
        info!(input = raw, "Starting URL analysis.");

        let url = match normalize(raw) {
            Ok(url) => url,
            Err(invalid) => return invalid_url_report(raw, &invalid, now),
        };

        let local = run_heuristics(raw, &url, &self.rules);

        if local.trusted {
            info!(host = %url.host, "Trusted host, skipping remote lookup.");
            let mut recommendations = local.recommendations;
            recommendations.extend(recommendations_for(&[]));
            return AnalysisReport {
                input: raw.to_string(),
                normalized: Some(url),
                timestamp: now,
                findings: Vec::new(),
                score: 0,
                tier: ThresholdTable::HEURISTIC_ONLY.tier_for(0),
                threshold_table: Some(ThresholdTable::HEURISTIC_ONLY),
                recommendations,
                remote: RemoteOutcome::Skipped,
            };
        }

        // Recommendations follow the local evidence only; remote findings and
        // the outage note do not change them.
        let mut recommendations = local.recommendations;
        recommendations.extend(recommendations_for(&local.findings));

        let seeded = ScoreAccumulator::seeded(local.findings);
        let (verdict, remote) = match self.source.lookup(url.bare_host()).await {
            Ok(payload) => {
                let verdict = aggregate_remote(seeded, &payload, &self.rules, now);
                (verdict, RemoteOutcome::Completed { payload })
            }
            Err(failure) => {
                let verdict = aggregate_degraded(seeded, &failure);
                (
                    verdict,
                    RemoteOutcome::Unavailable {
                        reason: failure.to_string(),
                    },
                )
            }
        };

        info!(host = %url.host, score = verdict.score, tier = %verdict.tier, "URL analysis finished.");
        AnalysisReport {
            input: raw.to_string(),
            normalized: Some(url),
            timestamp: now,
            findings: verdict.findings,
            score: verdict.score,
            tier: verdict.tier,
            threshold_table: Some(verdict.table),
            recommendations,
            remote,
        }
    }
}

/// The terminal report for input that is not a URL at all.
fn invalid_url_report(raw: &str, invalid: &InvalidUrl, now: DateTime<Utc>) -> AnalysisReport {
    warn!(error = %invalid, "Rejecting malformed input.");
    let finding = Finding::new(FindingCode::InvalidUrl);
    AnalysisReport {
        input: raw.to_string(),
        normalized: None,
        timestamp: now,
        score: finding.weight,
        findings: vec![finding],
        tier: RiskTier::High,
        threshold_table: None,
        recommendations: Vec::new(),
        remote: RemoteOutcome::Skipped,
    }
}
