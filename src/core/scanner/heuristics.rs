// src/core/scanner/heuristics.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;
use tracing::{debug, info};

use crate::core::knowledge_base::{RuleTables, TRUSTED_HOST_RECOMMENDATION, public_suffix_labels};
use crate::core::models::{Finding, FindingCode, NormalizedUrl};

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{3,}").expect("digit run pattern is valid"));

/// Inputs longer than this many characters are flagged.
const MAX_URL_LENGTH: usize = 100;
/// Hosts with more dot-separated labels than this are flagged.
const MAX_HOST_LABELS: usize = 4;

/// What the rule engine found for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicOutcome {
    pub findings: Vec<Finding>,
    pub score: u32,
    /// Set when the whitelist override discarded everything.
    pub trusted: bool,
    pub recommendations: Vec<String>,
}

/// Runs every local rule against the input and its normalized form.
///
/// Rules are independent: all of them are evaluated and each match adds one
/// finding. The whitelist check runs last and wipes whatever came before.
pub fn run_heuristics(raw: &str, url: &NormalizedUrl, rules: &RuleTables) -> HeuristicOutcome {
    let host = url.host.as_str();
    debug!(host, rules_version = %rules.version, "Running heuristic rules.");

    let checks: [(FindingCode, bool); 9] = [
        (FindingCode::NoHttps, !url.is_https()),
        (FindingCode::IpAddressHost, is_ip_literal(url.bare_host())),
        (FindingCode::AbusedTld, has_abused_tld(host, rules)),
        (FindingCode::NumericPattern, DIGIT_RUN.is_match(host)),
        (FindingCode::PhishingKeywords, has_phishing_keyword(host, url.path(), rules)),
        (FindingCode::BrandImpersonation, impersonates_brand(host, rules)),
        (FindingCode::UrlShortener, is_url_shortener(host, rules)),
        (FindingCode::ExcessiveSubdomains, host.split('.').count() > MAX_HOST_LABELS),
        (FindingCode::LongUrl, raw.chars().count() > MAX_URL_LENGTH),
    ];

    let findings: Vec<Finding> = checks
        .into_iter()
        .filter(|(_, matched)| *matched)
        .map(|(code, _)| {
            debug!(%code, "Heuristic rule matched.");
            Finding::new(code)
        })
        .collect();

    if rules.is_whitelisted(host) {
        info!(host, discarded = findings.len(), "Host is whitelisted, discarding heuristic findings.");
        return HeuristicOutcome {
            findings: Vec::new(),
            score: 0,
            trusted: true,
            recommendations: vec![TRUSTED_HOST_RECOMMENDATION.to_string()],
        };
    }

    let score: u32 = findings.iter().map(|f| f.weight).sum();
    info!(host, findings = findings.len(), score, "Heuristic rules finished.");
    HeuristicOutcome {
        findings,
        score,
        trusted: false,
        recommendations: Vec::new(),
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}

fn has_abused_tld(host: &str, rules: &RuleTables) -> bool {
    match host.rsplit_once('.') {
        Some((_, tld)) => rules.abused_tlds.iter().any(|t| t == tld),
        None => false,
    }
}

fn has_phishing_keyword(host: &str, path: &str, rules: &RuleTables) -> bool {
    let path = path.to_lowercase();
    rules
        .phishing_keywords
        .iter()
        .any(|kw| host.contains(kw.as_str()) || path.contains(kw.as_str()))
}

/// A brand glued to a hyphen (`secure-paypal`, `apple-id`) or used as a
/// subdomain label in front of someone else's domain (`paypal.example.tk`).
/// The brand's own registrable domain (`paypal.com`, `amazon.co.uk`) does
/// not match.
fn impersonates_brand(host: &str, rules: &RuleTables) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    let registrable_index = labels.len().saturating_sub(public_suffix_labels(host) + 1);

    rules.impersonated_brands.iter().any(|brand| {
        let hyphen_before = format!("-{brand}");
        let hyphen_after = format!("{brand}-");
        labels.iter().enumerate().any(|(i, label)| {
            label.contains(&hyphen_before)
                || label.contains(&hyphen_after)
                || (*label == brand.as_str() && i < registrable_index)
        })
    })
}

fn is_url_shortener(host: &str, rules: &RuleTables) -> bool {
    rules.url_shorteners.iter().any(|s| {
        host == s.as_str()
            || host
                .strip_suffix(s.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
