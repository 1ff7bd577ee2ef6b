// src/core/scanner/aggregator.rs

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::errors::ThreatIntelError;
use crate::core::knowledge_base::RuleTables;
use crate::core::models::{
    Finding, FindingCode, RemoteThreatPayload, RiskTier, SafetyVerdict, ThresholdTable,
};

/// Domains younger than this many days are treated as recently created.
const RECENT_DOMAIN_DAYS: i64 = 30;
/// Domains younger than this many days are treated as new.
const NEW_DOMAIN_DAYS: i64 = 180;

const REMOTE_RISK_HIGH: u32 = 5;
const REMOTE_RISK_MEDIUM: u32 = 3;
const VALID_CERT_CREDIT: u32 = 1;
const TRUSTED_ISSUER_CREDIT: u32 = 2;

/// Running score plus the ordered findings that produced it.
///
/// Every step consumes the accumulator and hands back the extended one, so
/// the order in which adjustments run is the order written in the code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreAccumulator {
    findings: Vec<Finding>,
    score: u32,
}

/// Final score, tier and findings of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub findings: Vec<Finding>,
    pub score: u32,
    pub tier: RiskTier,
    pub table: ThresholdTable,
}

impl ScoreAccumulator {
    /// Seeds the accumulator with local findings; their weights form the
    /// starting score.
    pub fn seeded(findings: Vec<Finding>) -> Self {
        let score = findings.iter().map(|f| f.weight).sum();
        Self { findings, score }
    }

    /// Appends a finding and adds its weight to the score.
    pub fn with_finding(mut self, finding: Finding) -> Self {
        debug!(code = %finding.code, weight = finding.weight, "Adding finding.");
        self.score = self.score.saturating_add(finding.weight);
        self.findings.push(finding);
        self
    }

    /// Raises the score without a finding of its own.
    pub fn penalize(mut self, amount: u32) -> Self {
        self.score = self.score.saturating_add(amount);
        self
    }

    /// Lowers the score, never below zero.
    pub fn credit(mut self, amount: u32) -> Self {
        self.score = self.score.saturating_sub(amount);
        self
    }

    pub fn finalize(self, table: ThresholdTable) -> Verdict {
        let tier = table.tier_for(self.score);
        info!(score = self.score, %tier, findings = self.findings.len(), "Aggregation finished.");
        Verdict {
            findings: self.findings,
            score: self.score,
            tier,
            table,
        }
    }
}

/// Merges a successful remote payload into the local result.
///
/// Adjustments run in a fixed order: certificate credits, the provider's own
/// risk label, the malicious-URL verdict, engine counts, domain age, and
/// finally the penalty for unusable certificate data. The tier is derived
/// once, from the final score, using the remote-augmented thresholds.
pub fn aggregate_remote(
    local: ScoreAccumulator,
    payload: &RemoteThreatPayload,
    rules: &RuleTables,
    now: DateTime<Utc>,
) -> Verdict {
    let acc = apply_certificate_credits(local, payload, rules);
    let acc = apply_provider_risk_label(acc, payload);
    let acc = apply_safe_browsing(acc, payload);
    let acc = apply_engine_scan(acc, payload);
    let acc = apply_domain_age(acc, payload, now);
    let acc = apply_certificate_failure(acc, payload);
    acc.finalize(ThresholdTable::REMOTE_AUGMENTED)
}

/// Builds the local-only result after the remote lookup failed.
///
/// The outage is recorded as a zero-weight informational finding and the
/// lower heuristic-only thresholds apply.
pub fn aggregate_degraded(local: ScoreAccumulator, failure: &ThreatIntelError) -> Verdict {
    warn!(error = %failure, "Remote analysis unavailable, scoring on local evidence only.");
    local
        .with_finding(Finding::new(FindingCode::RemoteUnavailable).with_message(outage_message(failure)))
        .finalize(ThresholdTable::HEURISTIC_ONLY)
}

fn outage_message(failure: &ThreatIntelError) -> String {
    match failure {
        ThreatIntelError::Timeout { .. } => {
            "Remote security analysis timed out. Local analysis completed.".to_string()
        }
        ThreatIntelError::Unreachable { .. } => "Unable to connect to the remote security analysis \
             service. Local analysis completed."
            .to_string(),
        ThreatIntelError::RemoteError { status, message } => format!(
            "Remote security analysis service error (HTTP {status}: {message}). Local analysis completed."
        ),
    }
}

fn apply_certificate_credits(
    acc: ScoreAccumulator,
    payload: &RemoteThreatPayload,
    rules: &RuleTables,
) -> ScoreAccumulator {
    let Ok(Some(cert)) = &payload.certificate else {
        return acc;
    };
    if !cert.valid {
        return acc;
    }

    debug!("Certificate valid, crediting score.");
    let acc = acc.credit(VALID_CERT_CREDIT);
    match cert.issuer.as_deref() {
        Some(issuer) if rules.is_trusted_issuer(issuer) => {
            debug!(issuer, "Certificate issued by a trusted authority, crediting score.");
            acc.credit(TRUSTED_ISSUER_CREDIT)
        }
        _ => acc,
    }
}

fn apply_provider_risk_label(acc: ScoreAccumulator, payload: &RemoteThreatPayload) -> ScoreAccumulator {
    let Some(label) = payload.risk_level.as_deref() else {
        return acc;
    };
    let label = label.to_lowercase();
    if label.contains("high") {
        debug!(%label, "Provider labels the host high risk.");
        acc.penalize(REMOTE_RISK_HIGH)
    } else if label.contains("medium") {
        debug!(%label, "Provider labels the host medium risk.");
        acc.penalize(REMOTE_RISK_MEDIUM)
    } else {
        acc
    }
}

fn apply_safe_browsing(acc: ScoreAccumulator, payload: &RemoteThreatPayload) -> ScoreAccumulator {
    let Ok(Some(result)) = &payload.safe_browsing else {
        return acc;
    };
    if result.verdict != SafetyVerdict::Unsafe {
        return acc;
    }

    let threats = result.threat_types();
    let finding = Finding::new(FindingCode::MaliciousSite);
    let finding = if threats.is_empty() {
        finding
    } else {
        let message = format!("{} ({})", finding.message, threats.join(", "));
        finding.with_message(message)
    };
    acc.with_finding(finding)
}

fn apply_engine_scan(acc: ScoreAccumulator, payload: &RemoteThreatPayload) -> ScoreAccumulator {
    let Ok(Some(scan)) = &payload.engine_scan else {
        return acc;
    };

    let acc = if scan.malicious > 0 {
        acc.with_finding(
            Finding::new(FindingCode::EnginesMalicious)
                .with_weight(scan.malicious.saturating_mul(2))
                .with_message(format!(
                    "{} security vendor(s) flagged this domain as malicious",
                    scan.malicious
                )),
        )
    } else {
        acc
    };

    if scan.suspicious > 0 {
        acc.with_finding(
            Finding::new(FindingCode::EnginesSuspicious)
                .with_weight(scan.suspicious)
                .with_message(format!(
                    "{} security vendor(s) flagged this domain as suspicious",
                    scan.suspicious
                )),
        )
    } else {
        acc
    }
}

fn apply_domain_age(
    acc: ScoreAccumulator,
    payload: &RemoteThreatPayload,
    now: DateTime<Utc>,
) -> ScoreAccumulator {
    let Ok(Some(whois)) = &payload.whois else {
        return acc;
    };
    let age_days = match whois.domain_age_days(now) {
        None => return acc,
        Some(Err(reason)) => {
            warn!(%reason, "Could not parse domain creation date.");
            return acc;
        }
        Some(Ok(days)) if days < 0 => {
            warn!(
                creation_date = whois.creation_date.as_deref(),
                days, "Domain creation date lies in the future, ignoring it."
            );
            return acc;
        }
        Some(Ok(days)) => days,
    };

    if age_days < RECENT_DOMAIN_DAYS {
        acc.with_finding(
            Finding::new(FindingCode::RecentlyCreatedDomain)
                .with_message(format!("Domain was created only {age_days} days ago")),
        )
    } else if age_days < NEW_DOMAIN_DAYS {
        acc.with_finding(
            Finding::new(FindingCode::NewDomain).with_message(format!(
                "Domain was created {age_days} days ago (relatively new)"
            )),
        )
    } else {
        acc
    }
}

/// Certificate data that could not be obtained at all (as opposed to a
/// certificate reported invalid) costs a fixed penalty.
fn apply_certificate_failure(acc: ScoreAccumulator, payload: &RemoteThreatPayload) -> ScoreAccumulator {
    match &payload.certificate {
        Err(reason) => {
            warn!(%reason, "Certificate data unavailable from provider.");
            acc.with_finding(Finding::new(FindingCode::SslVerificationFailed))
        }
        Ok(_) => acc,
    }
}
