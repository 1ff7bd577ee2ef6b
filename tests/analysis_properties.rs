//! End-to-end properties of `UrlAnalyzer::analyze`.
//!
//! The remote service is a wiremock server so the real client, parser and
//! aggregator all take part.

use serde_json::{Value, json};
use std::time::Duration;
use url::Url;
use url_risk_scanner::core::knowledge_base::RuleTables;
use url_risk_scanner::core::models::{FindingCode, RemoteOutcome, ThresholdTable};
use url_risk_scanner::{AnalyzerConfig, RiskTier, ThreatIntelClient, UrlAnalyzer};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn analyzer_answering(body: Value) -> (MockServer, UrlAnalyzer) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    let analyzer = analyzer_for(&server, Duration::from_secs(5));
    (server, analyzer)
}

fn analyzer_for(server: &MockServer, timeout: Duration) -> UrlAnalyzer {
    let config = AnalyzerConfig::default()
        .with_endpoint(&format!("{}/api/check-ssl", server.uri()))
        .unwrap();
    let config = AnalyzerConfig { timeout, ..config };
    UrlAnalyzer::from_config(&config).unwrap()
}

/// Analyzer whose remote endpoint refuses connections.
fn offline_analyzer() -> UrlAnalyzer {
    let closed_addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let endpoint = Url::parse(&format!("http://{closed_addr}/api/check-ssl")).unwrap();
    let client = ThreatIntelClient::new(endpoint, Duration::from_secs(5), "test").unwrap();
    UrlAnalyzer::new(client, RuleTables::builtin())
}

fn neutral() -> Value {
    json!({
        "certificate": { "valid": false },
        "risk_level": "Unknown",
        "google_safe_browsing": { "safe": true },
        "virustotal_info": { "malicious": 0, "suspicious": 0 },
        "whois_info": { "creation_date": "1995-08-14" }
    })
}

#[tokio::test]
async fn unparseable_inputs_yield_the_fixed_high_risk_report() {
    let analyzer = offline_analyzer();
    for raw in ["", "   ", "not a url", "http://", "https://exa mple.com", "ftp://[::1"] {
        let report = analyzer.analyze(raw).await;
        assert_eq!(report.tier, RiskTier::High, "{raw:?}");
        assert_eq!(report.score, 5, "{raw:?}");
        assert_eq!(report.findings.len(), 1, "{raw:?}");
        assert_eq!(report.findings[0].category, "Invalid URL", "{raw:?}");
        assert!(report.normalized.is_none());
        assert!(report.threshold_table.is_none());
    }
}

#[tokio::test]
async fn plain_http_finding_survives_neutral_remote_data() {
    let (_server, analyzer) = analyzer_answering(neutral()).await;
    let report = analyzer.analyze("http://example.com").await;
    let no_https = report
        .findings
        .iter()
        .find(|f| f.code == FindingCode::NoHttps)
        .expect("no-https finding present");
    assert_eq!(no_https.weight, 3);
    assert!(matches!(report.remote, RemoteOutcome::Completed { .. }));
}

#[tokio::test]
async fn plain_http_finding_survives_remote_outage() {
    let report = offline_analyzer().analyze("http://example.com").await;
    assert!(report.has_finding(FindingCode::NoHttps));
}

#[tokio::test]
async fn clean_url_during_outage_keeps_the_safe_recommendation() {
    let report = offline_analyzer().analyze("https://example.com").await;
    assert_eq!(report.score, 0);
    assert_eq!(report.tier, RiskTier::Low);
    assert!(report.has_finding(FindingCode::RemoteUnavailable));
    assert_eq!(
        report.recommendations,
        vec!["URL appears safe based on initial checks.".to_string()]
    );
}

#[tokio::test]
async fn whitelisted_hosts_score_zero_whatever_the_path() {
    let analyzer = offline_analyzer();
    let long_path = format!("google.com/login/verify/account/{}", "9".repeat(150));
    for raw in ["google.com", "http://google.com/secure-update", long_path.as_str()] {
        let report = analyzer.analyze(raw).await;
        assert!(report.findings.is_empty(), "{raw:?}");
        assert_eq!(report.score, 0, "{raw:?}");
        assert_eq!(report.tier, RiskTier::Low);
    }
}

#[tokio::test]
async fn same_input_same_report_except_timestamp() {
    let (_server, analyzer) = analyzer_answering(json!({
        "certificate": { "valid": true, "issuer": "Unknown CA" },
        "risk_level": "Medium",
        "virustotal_info": { "malicious": 1, "suspicious": 2 },
        "whois_info": { "creation_date": "2001-01-01" }
    }))
    .await;

    let first = analyzer.analyze("http://login-portal.example.tk/verify").await;
    let mut second = analyzer.analyze("http://login-portal.example.tk/verify").await;
    second.timestamp = first.timestamp;
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn unsafe_verdict_adds_exactly_eight() {
    let (_a, neutral_analyzer) = analyzer_answering(neutral()).await;
    let mut flagged_body = neutral();
    flagged_body["google_safe_browsing"] = json!({
        "safe": false,
        "details": [{ "threatType": "MALWARE", "platformType": "ANY_PLATFORM" }]
    });
    let (_b, flagged_analyzer) = analyzer_answering(flagged_body).await;

    for raw in ["https://example.com", "http://example.com", "http://account-update.example.tk"] {
        let base = neutral_analyzer.analyze(raw).await;
        let flagged = flagged_analyzer.analyze(raw).await;
        assert_eq!(flagged.score, base.score + 8, "{raw}");
        assert!(flagged.has_finding(FindingCode::MaliciousSite));
        if base.tier != RiskTier::High {
            assert!(flagged.tier > base.tier, "{raw}");
        }
    }
}

#[tokio::test]
async fn remote_table_boundaries_at_four_and_eight() {
    let (_a, four) = analyzer_answering(json!({ "virustotal_info": { "suspicious": 4 } })).await;
    let report = four.analyze("https://example.com").await;
    assert_eq!(report.score, 4);
    assert_eq!(report.tier, RiskTier::Medium);
    assert_eq!(report.threshold_table, Some(ThresholdTable::REMOTE_AUGMENTED));

    let (_b, three) = analyzer_answering(json!({ "virustotal_info": { "suspicious": 3 } })).await;
    assert_eq!(three.analyze("https://example.com").await.tier, RiskTier::Low);

    let (_c, eight) = analyzer_answering(json!({ "virustotal_info": { "malicious": 4 } })).await;
    let report = eight.analyze("https://example.com").await;
    assert_eq!(report.score, 8);
    assert_eq!(report.tier, RiskTier::High);

    let (_d, seven) = analyzer_answering(json!({ "virustotal_info": { "suspicious": 7 } })).await;
    assert_eq!(seven.analyze("https://example.com").await.tier, RiskTier::Medium);
}

#[tokio::test]
async fn heuristic_table_boundaries_at_three_and_seven() {
    let analyzer = offline_analyzer();
    let cases = [
        ("https://example.tk", 2, RiskTier::Low),
        ("http://example.com", 3, RiskTier::Medium),
        ("https://apple-store.tk", 6, RiskTier::Medium),
        ("http://paypal-help.com", 7, RiskTier::High),
    ];
    for (raw, score, tier) in cases {
        let report = analyzer.analyze(raw).await;
        assert_eq!(report.score, score, "{raw}");
        assert_eq!(report.tier, tier, "{raw}");
        assert_eq!(report.threshold_table, Some(ThresholdTable::HEURISTIC_ONLY));
    }
}

#[tokio::test]
async fn remote_timeout_still_completes_the_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "google_safe_browsing": { "safe": false } }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let analyzer = analyzer_for(&server, Duration::from_millis(250));

    let report = analyzer.analyze("http://secure-login.example.tk").await;

    let codes: Vec<_> = report.findings.iter().map(|f| f.code).collect();
    assert_eq!(
        codes,
        vec![
            FindingCode::NoHttps,
            FindingCode::AbusedTld,
            FindingCode::PhishingKeywords,
            FindingCode::RemoteUnavailable,
        ]
    );
    let note = report.findings.last().unwrap();
    assert_eq!(note.weight, 0);
    assert_eq!(note.severity, RiskTier::Low);
    assert_eq!(report.score, 7);
    assert_eq!(report.tier, RiskTier::High);
    assert_eq!(report.threshold_table, Some(ThresholdTable::HEURISTIC_ONLY));
    assert!(matches!(report.remote, RemoteOutcome::Unavailable { .. }));
}

#[tokio::test]
async fn errored_certificate_section_costs_three() {
    let (_server, analyzer) =
        analyzer_answering(json!({ "certificate": { "error": "handshake failure" } })).await;
    let report = analyzer.analyze("https://example.com").await;
    assert_eq!(report.score, 3);
    assert_eq!(report.findings[0].code, FindingCode::SslVerificationFailed);
    assert_eq!(report.tier, RiskTier::Low);
}

#[tokio::test]
async fn reports_serialize_for_the_presentation_layer() {
    let (_server, analyzer) = analyzer_answering(neutral()).await;
    let report = analyzer.analyze("http://example.com").await;
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["tier"], "low");
    assert_eq!(value["findings"][0]["code"], "NO_HTTPS");
    assert_eq!(value["remote"]["status"], "completed");
    let back: url_risk_scanner::AnalysisReport = serde_json::from_value(value).unwrap();
    assert_eq!(back, report);
}
