//! This module is the static, read-only "brain" of the analyzer.
//! It holds the versioned rule tables the heuristic engine and the aggregator
//! consult, plus the catalogue of every finding the engine can report with its
//! human-readable title, default message, severity and weight.
//! Keeping this data apart from the scoring code lets the tables be updated
//! and tested on their own.

use crate::core::models::{Finding, FindingCode, RiskTier};
use serde::{Deserialize, Serialize};

/// Version tag of the built-in tables. Bump whenever a list below changes.
pub const BUILTIN_RULES_VERSION: &str = "2025.1";

const ABUSED_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "pw", "top", "click", "fit", "review", "space", "tech",
];

const PHISHING_KEYWORDS: &[&str] = &["login", "secure", "update", "account", "verify", "signin"];

const IMPERSONATED_BRANDS: &[&str] = &[
    "paypal", "apple", "amazon", "google", "microsoft", "facebook", "netflix", "bank", "wallet",
];

const URL_SHORTENERS: &[&str] = &[
    "bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "short.link", "is.gd", "buff.ly",
    "cutt.ly", "rebrand.ly",
];

const WHITELISTED_HOSTS: &[&str] = &["google.com", "www.google.com", "microsoft.com", "apple.com"];

const TRUSTED_CERT_AUTHORITIES: &[&str] = &[
    "digicert", "let's encrypt", "globalsign", "sectigo", "comodo", "google trust",
];

/// Public suffixes made of two labels. A registrable domain under one of
/// these spans three labels (`amazon.co.uk`).
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.nz", "co.jp",
    "co.in", "co.za", "com.br", "com.mx", "com.cn", "com.tr", "co.kr",
];

/// Number of labels the public suffix of `host` occupies.
pub fn public_suffix_labels(host: &str) -> usize {
    let is_two_label = TWO_LABEL_SUFFIXES.iter().any(|suffix| {
        host.strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.'))
    });
    if is_two_label { 2 } else { 1 }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Pattern and trust lists used during scoring.
///
/// All entries are compared lowercase. A deployment may replace the built-in
/// set with a JSON document of the same shape (see `AnalyzerConfig`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleTables {
    pub version: String,
    /// TLDs without the leading dot.
    pub abused_tlds: Vec<String>,
    pub phishing_keywords: Vec<String>,
    pub impersonated_brands: Vec<String>,
    pub url_shorteners: Vec<String>,
    pub whitelisted_hosts: Vec<String>,
    pub trusted_cert_authorities: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTables {
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_RULES_VERSION.to_string(),
            abused_tlds: owned(ABUSED_TLDS),
            phishing_keywords: owned(PHISHING_KEYWORDS),
            impersonated_brands: owned(IMPERSONATED_BRANDS),
            url_shorteners: owned(URL_SHORTENERS),
            whitelisted_hosts: owned(WHITELISTED_HOSTS),
            trusted_cert_authorities: owned(TRUSTED_CERT_AUTHORITIES),
        }
    }

    /// Lowercases every entry so lookups can compare directly.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.abused_tlds,
            &mut self.phishing_keywords,
            &mut self.impersonated_brands,
            &mut self.url_shorteners,
            &mut self.whitelisted_hosts,
            &mut self.trusted_cert_authorities,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.trim().trim_start_matches('.').to_lowercase();
            }
        }
        self
    }

    pub fn with_whitelisted_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trusted_cert_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_cert_authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_whitelisted(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.whitelisted_hosts.iter().any(|h| *h == host)
    }

    /// Case-insensitive substring match of an issuer against the trusted CA list.
    pub fn is_trusted_issuer(&self, issuer: &str) -> bool {
        let issuer = issuer.to_lowercase();
        self.trusted_cert_authorities
            .iter()
            .any(|ca| issuer.contains(ca.as_str()))
    }
}

/// All the human-readable information about a specific finding.
pub struct FindingDetail {
    pub code: FindingCode,
    /// Short title, used as the finding's category label.
    pub title: &'static str,
    pub severity: RiskTier,
    /// Weight added to the score. Remote findings whose weight depends on
    /// provider counts override this when they are built.
    pub weight: u32,
    /// Default message when no more specific text is available.
    pub description: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    FindingDetail {
        code: FindingCode::InvalidUrl,
        title: "Invalid URL",
        severity: RiskTier::High,
        weight: 5,
        description: "URL format is invalid or malformed",
    },
    // --- Heuristics: structure and patterns of the URL itself ---
    FindingDetail {
        code: FindingCode::NoHttps,
        title: "No HTTPS",
        severity: RiskTier::Medium,
        weight: 3,
        description: "Website does not use secure HTTPS protocol",
    },
    FindingDetail {
        code: FindingCode::IpAddressHost,
        title: "IP Address Instead of Domain",
        severity: RiskTier::High,
        weight: 4,
        description: "Detected: the host is a bare IP address rather than a domain name",
    },
    FindingDetail {
        code: FindingCode::AbusedTld,
        title: "Free or Abused TLD",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Detected: the domain uses a top-level domain frequently abused for phishing",
    },
    FindingDetail {
        code: FindingCode::NumericPattern,
        title: "Numeric Pattern in Domain",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Detected: the host contains a run of three or more digits",
    },
    FindingDetail {
        code: FindingCode::PhishingKeywords,
        title: "Suspicious Keywords",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Detected: the URL contains keywords typical of phishing pages",
    },
    FindingDetail {
        code: FindingCode::BrandImpersonation,
        title: "Brand Impersonation Pattern",
        severity: RiskTier::High,
        weight: 4,
        description: "Detected: a well-known brand name is embedded in an unrelated domain",
    },
    FindingDetail {
        code: FindingCode::UrlShortener,
        title: "URL Shortener",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Detected: the link goes through a URL shortening service that hides its destination",
    },
    FindingDetail {
        code: FindingCode::ExcessiveSubdomains,
        title: "Excessive Subdomains",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Suspicious subdomain structure detected",
    },
    FindingDetail {
        code: FindingCode::LongUrl,
        title: "Long URL",
        severity: RiskTier::Low,
        weight: 1,
        description: "URL is unusually long",
    },
    // --- Remote intelligence ---
    FindingDetail {
        code: FindingCode::RemoteUnavailable,
        title: "Remote Analysis Unavailable",
        severity: RiskTier::Low,
        weight: 0,
        description: "External security analysis is temporarily unavailable. Local analysis completed.",
    },
    FindingDetail {
        code: FindingCode::MaliciousSite,
        title: "Malicious Website Detected",
        severity: RiskTier::High,
        weight: 8,
        description: "Google Safe Browsing detected this site as potentially harmful",
    },
    FindingDetail {
        code: FindingCode::EnginesMalicious,
        title: "Multi-Engine Threat Detection",
        severity: RiskTier::High,
        weight: 2,
        description: "Security vendors flagged this domain as malicious",
    },
    FindingDetail {
        code: FindingCode::EnginesSuspicious,
        title: "Multi-Engine Suspicious Activity",
        severity: RiskTier::Medium,
        weight: 1,
        description: "Security vendors flagged this domain as suspicious",
    },
    FindingDetail {
        code: FindingCode::RecentlyCreatedDomain,
        title: "Recently Created Domain",
        severity: RiskTier::High,
        weight: 3,
        description: "Domain was registered less than 30 days ago",
    },
    FindingDetail {
        code: FindingCode::NewDomain,
        title: "New Domain",
        severity: RiskTier::Medium,
        weight: 2,
        description: "Domain was registered less than 180 days ago (relatively new)",
    },
    FindingDetail {
        code: FindingCode::SslVerificationFailed,
        title: "SSL Analysis Error",
        severity: RiskTier::Medium,
        weight: 3,
        description: "Unable to verify SSL certificate. Domain may be insecure or malicious.",
    },
];

/// Retrieves the full detail for a given finding code.
pub fn get_finding_detail(code: FindingCode) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}

impl Finding {
    /// Builds a finding with the catalogue's default message and weight.
    pub fn new(code: FindingCode) -> Self {
        match get_finding_detail(code) {
            Some(detail) => Finding {
                code,
                category: detail.title.to_string(),
                message: detail.description.to_string(),
                severity: detail.severity,
                weight: detail.weight,
            },
            None => Finding {
                code,
                category: code.to_string(),
                message: code.to_string(),
                severity: RiskTier::Low,
                weight: 0,
            },
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

// --- Recommendations ---

pub const TRUSTED_HOST_RECOMMENDATION: &str = "URL is verified and commonly trusted.";

pub const SAFE_RECOMMENDATION: &str = "URL appears safe based on initial checks.";

pub const CAUTION_RECOMMENDATIONS: &[&str] = &[
    "Exercise caution when visiting this website.",
    "Verify the website's legitimacy through official sources.",
    "Do not enter sensitive info unless verified.",
];

/// Fixed advice that depends only on whether anything was found.
pub fn recommendations_for(findings: &[Finding]) -> Vec<String> {
    if findings.is_empty() {
        vec![SAFE_RECOMMENDATION.to_string()]
    } else {
        CAUTION_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
    }
}
