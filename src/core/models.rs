// src/core/models.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter};
use url::Url;

// --- Reusable Result Types ---

/// Outcome of one independently parsed section of a remote response.
///
/// `Ok(Some(value))` means the section was present and parsed, `Ok(None)` means
/// the provider did not send it, and `Err(reason)` means it was sent but was
/// unusable (provider-side error or malformed shape).
pub type ScanResult<T> = Result<Option<T>, String>;

// --- Core Data Models ---

/// Three-level classification used both for individual findings and for the
/// overall verdict of a report.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Score boundaries for mapping a numeric score onto a [`RiskTier`].
///
/// Two tables exist: one used when remote intelligence contributed to the
/// score and a lower one for local-only evidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThresholdTable {
    pub high: u32,
    pub medium: u32,
}

impl ThresholdTable {
    /// Thresholds applied after remote adjustments were merged.
    pub const REMOTE_AUGMENTED: ThresholdTable = ThresholdTable { high: 8, medium: 4 };
    /// Thresholds applied when only heuristic findings are available.
    pub const HEURISTIC_ONLY: ThresholdTable = ThresholdTable { high: 7, medium: 3 };

    pub fn tier_for(&self, score: u32) -> RiskTier {
        if score >= self.high {
            RiskTier::High
        } else if score >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Machine-readable identifier of every finding the engine can emit.
/// Human-readable text for each code lives in the knowledge base.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    // Normalizer
    InvalidUrl,
    // Heuristic rules
    NoHttps,
    IpAddressHost,
    AbusedTld,
    NumericPattern,
    PhishingKeywords,
    BrandImpersonation,
    UrlShortener,
    ExcessiveSubdomains,
    LongUrl,
    // Remote intelligence
    RemoteUnavailable,
    MaliciousSite,
    EnginesMalicious,
    EnginesSuspicious,
    RecentlyCreatedDomain,
    NewDomain,
    SslVerificationFailed,
}

/// One detected issue. Findings are plain values; once pushed into a report
/// their order is preserved (local findings first, then remote ones).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub code: FindingCode,
    pub category: String,
    pub message: String,
    pub severity: RiskTier,
    pub weight: u32,
}

/// A URL that survived normalization, with the pieces every later stage needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: Url,
    pub scheme: String,
    pub host: String,
}

impl NormalizedUrl {
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Host without the square brackets `url` keeps around IPv6 literals.
    pub fn bare_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

// --- Remote Threat-Intel Models ---

/// Certificate inspection result as reported by the remote service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateStatus {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// Tri-state verdict of the malicious-URL list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SafetyVerdict {
    Safe,
    Unsafe,
    Unknown,
}

impl From<Option<bool>> for SafetyVerdict {
    fn from(safe: Option<bool>) -> Self {
        match safe {
            Some(true) => SafetyVerdict::Safe,
            Some(false) => SafetyVerdict::Unsafe,
            None => SafetyVerdict::Unknown,
        }
    }
}

/// A single threat match returned by the malicious-URL list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreatMatch {
    #[serde(rename = "threatType", default)]
    pub threat_type: Option<String>,
    #[serde(rename = "platformType", default)]
    pub platform_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeBrowsingResult {
    pub verdict: SafetyVerdict,
    pub details: Vec<ThreatMatch>,
}

impl SafeBrowsingResult {
    /// Distinct threat types in the order the provider listed them.
    pub fn threat_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for threat in &self.details {
            if let Some(kind) = threat.threat_type.as_deref() {
                if !seen.contains(&kind) {
                    seen.push(kind);
                }
            }
        }
        seen
    }
}

/// Counts from the multi-engine scanner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineScanCounts {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    /// Raw per-category tally (e.g. "harmless", "undetected", ...).
    #[serde(default)]
    pub raw: Option<BTreeMap<String, u64>>,
}

impl EngineScanCounts {
    pub fn total_engines(&self) -> Option<u64> {
        self.raw.as_ref().map(|raw| raw.values().sum())
    }
}

/// Domain registration record. Dates are kept as the provider sent them and
/// parsed on demand, since registries disagree on formats.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhoisRecord {
    pub domain_name: Option<String>,
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub updated_date: Option<String>,
    pub expiration_date: Option<String>,
}

impl WhoisRecord {
    pub fn created_at(&self) -> Option<Result<DateTime<Utc>, String>> {
        self.creation_date.as_deref().map(parse_registry_date)
    }

    /// Whole days between creation and `now`. `None` when no creation date
    /// was reported, `Err` when it does not parse.
    pub fn domain_age_days(&self, now: DateTime<Utc>) -> Option<Result<i64, String>> {
        self.created_at()
            .map(|created| created.map(|at| now.signed_duration_since(at).num_days()))
    }

    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> Option<i64> {
        let expires = parse_registry_date(self.expiration_date.as_deref()?).ok()?;
        Some(expires.signed_duration_since(now).num_days())
    }
}

/// Parses the handful of date layouts registries are known to emit.
pub fn parse_registry_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("unrecognized date format: {trimmed}"))
}

/// Combined response of the remote aggregation endpoint. Every section is
/// parsed on its own so one broken provider never hides the others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteThreatPayload {
    pub certificate: ScanResult<CertificateStatus>,
    /// Categorical label the service assigns on its own (e.g. "High Risk").
    pub risk_level: Option<String>,
    /// Free-text assessment accompanying the label.
    pub feedback: Option<String>,
    pub safe_browsing: ScanResult<SafeBrowsingResult>,
    pub engine_scan: ScanResult<EngineScanCounts>,
    pub whois: ScanResult<WhoisRecord>,
}

impl Default for RemoteThreatPayload {
    fn default() -> Self {
        Self {
            certificate: Ok(None),
            risk_level: None,
            feedback: None,
            safe_browsing: Ok(None),
            engine_scan: Ok(None),
            whois: Ok(None),
        }
    }
}

/// What happened to the remote lookup for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome {
    Completed { payload: RemoteThreatPayload },
    Unavailable { reason: String },
    /// Lookup not attempted (invalid input or trusted host).
    Skipped,
}

// --- Main Report ---

/// The finished result of one analysis, handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisReport {
    pub input: String,
    pub normalized: Option<NormalizedUrl>,
    pub timestamp: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub score: u32,
    pub tier: RiskTier,
    /// Table the tier was derived from. `None` for rejected input, whose tier
    /// is fixed rather than looked up.
    pub threshold_table: Option<ThresholdTable>,
    pub recommendations: Vec<String>,
    pub remote: RemoteOutcome,
}

impl AnalysisReport {
    pub fn issues_found(&self) -> usize {
        self.findings.len()
    }

    pub fn has_finding(&self, code: FindingCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }
}
