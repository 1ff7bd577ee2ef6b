// src/core/scanner/threat_intel.rs

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::AnalyzerConfig;
use crate::core::errors::{ConfigError, ThreatIntelError};
use crate::core::models::{
    CertificateStatus, EngineScanCounts, RemoteThreatPayload, SafeBrowsingResult, ScanResult,
    ThreatMatch, WhoisRecord,
};

/// Anything that can answer "what do remote providers know about this host".
///
/// The production implementation is [`ThreatIntelClient`]; tests plug in
/// canned responses.
pub trait ThreatIntelSource {
    fn lookup(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<RemoteThreatPayload, ThreatIntelError>> + Send;
}

/// HTTP client for the threat-intel aggregation endpoint.
///
/// One POST per lookup, bounded by a hard deadline, never retried.
#[derive(Debug, Clone)]
pub struct ThreatIntelClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    hostname: &'a str,
}

impl ThreatIntelClient {
    pub fn new(endpoint: Url, timeout: Duration, user_agent: &str) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        Self::new(config.endpoint.clone(), config.timeout, &config.user_agent)
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> ThreatIntelError {
        if e.is_timeout() {
            ThreatIntelError::Timeout {
                after: self.timeout,
            }
        } else {
            error!(error = %e, connect = e.is_connect(), "Threat-intel request failed.");
            ThreatIntelError::Unreachable {
                reason: e.to_string(),
            }
        }
    }

    async fn exchange(&self, host: &str) -> Result<(u16, Vec<u8>), ThreatIntelError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&LookupRequest { hostname: host })
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        info!(%status, "Received threat-intel response.");
        if !status.is_success() {
            return Err(ThreatIntelError::RemoteError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ThreatIntelError::Timeout {
                    after: self.timeout,
                }
            } else {
                ThreatIntelError::RemoteError {
                    status: status.as_u16(),
                    message: format!("failed to read response body: {e}"),
                }
            }
        })?;
        Ok((status.as_u16(), body.to_vec()))
    }
}

impl ThreatIntelSource for ThreatIntelClient {
    async fn lookup(&self, host: &str) -> Result<RemoteThreatPayload, ThreatIntelError> {
        info!(host, endpoint = %self.endpoint, "Requesting remote threat intelligence.");

        let (status, body) = match tokio::time::timeout(self.timeout, self.exchange(host)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(host, timeout_secs = self.timeout.as_secs_f32(), "Threat-intel request hit its deadline.");
                return Err(ThreatIntelError::Timeout {
                    after: self.timeout,
                });
            }
        };

        parse_payload(status, &body)
    }
}

// --- Payload Parsing ---

/// Splits a combined response into its sections, each parsed on its own.
///
/// A body that is not a JSON object still yields a payload, with every
/// section marked as errored. A top-level `error` string means the service
/// itself failed and is reported as [`ThreatIntelError::RemoteError`].
pub fn parse_payload(status: u16, body: &[u8]) -> Result<RemoteThreatPayload, ThreatIntelError> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Threat-intel body is not valid JSON.");
            return Ok(all_sections_errored(format!("malformed response body: {e}")));
        }
    };

    let Some(object) = value.as_object() else {
        warn!("Threat-intel body is not a JSON object.");
        return Ok(all_sections_errored(
            "malformed response body: expected a JSON object".to_string(),
        ));
    };

    if let Some(message) = object.get("error").and_then(Value::as_str) {
        return Err(ThreatIntelError::RemoteError {
            status,
            message: message.to_string(),
        });
    }

    let payload = RemoteThreatPayload {
        certificate: parse_section::<CertificateWire>(object, "certificate").map(|c| c.map(Into::into)),
        risk_level: string_field(object, "risk_level"),
        feedback: string_field(object, "feedback"),
        safe_browsing: parse_section::<SafeBrowsingWire>(object, "google_safe_browsing")
            .map(|s| s.map(Into::into)),
        engine_scan: parse_section::<EngineScanWire>(object, "virustotal_info").map(|e| e.map(Into::into)),
        whois: parse_section::<WhoisWire>(object, "whois_info").map(|w| w.map(Into::into)),
    };
    debug!(?payload, "Parsed threat-intel payload.");
    Ok(payload)
}

fn all_sections_errored(reason: String) -> RemoteThreatPayload {
    RemoteThreatPayload {
        certificate: Err(reason.clone()),
        risk_level: None,
        feedback: None,
        safe_browsing: Err(reason.clone()),
        engine_scan: Err(reason.clone()),
        whois: Err(reason),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_section<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> ScanResult<T> {
    let section = match object.get(key) {
        None | Some(Value::Null) => {
            debug!(section = key, "Section absent from threat-intel payload.");
            return Ok(None);
        }
        Some(v) => v,
    };

    if let Some(reason) = section.get("error").and_then(Value::as_str) {
        warn!(section = key, reason, "Provider reported an error for section.");
        return Err(reason.to_string());
    }

    T::deserialize(section).map(Some).map_err(|e| {
        warn!(section = key, error = %e, "Could not parse section of threat-intel payload.");
        format!("malformed {key} section: {e}")
    })
}

// --- Wire Shapes ---
// The service is loose about nulls and types; these structs absorb that
// before values reach the models.

#[derive(Deserialize)]
struct CertificateWire {
    valid: Option<bool>,
    issuer: Option<String>,
    common_name: Option<String>,
    valid_from: Option<String>,
    valid_until: Option<String>,
}

impl From<CertificateWire> for CertificateStatus {
    fn from(w: CertificateWire) -> Self {
        Self {
            valid: w.valid.unwrap_or(false),
            issuer: w.issuer,
            common_name: w.common_name,
            valid_from: w.valid_from,
            valid_until: w.valid_until,
        }
    }
}

#[derive(Deserialize)]
struct SafeBrowsingWire {
    safe: Option<bool>,
    details: Option<Vec<ThreatMatch>>,
}

impl From<SafeBrowsingWire> for SafeBrowsingResult {
    fn from(w: SafeBrowsingWire) -> Self {
        Self {
            verdict: w.safe.into(),
            details: w.details.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct EngineScanWire {
    malicious: Option<u32>,
    suspicious: Option<u32>,
    raw: Option<BTreeMap<String, u64>>,
}

impl From<EngineScanWire> for EngineScanCounts {
    fn from(w: EngineScanWire) -> Self {
        Self {
            malicious: w.malicious.unwrap_or(0),
            suspicious: w.suspicious.unwrap_or(0),
            raw: w.raw,
        }
    }
}

#[derive(Deserialize)]
struct WhoisWire {
    #[serde(default, deserialize_with = "registry_value")]
    domain_name: Option<String>,
    #[serde(default, deserialize_with = "registry_value")]
    registrar: Option<String>,
    #[serde(default, deserialize_with = "registry_value")]
    creation_date: Option<String>,
    #[serde(default, deserialize_with = "registry_value")]
    updated_date: Option<String>,
    #[serde(default, deserialize_with = "registry_value")]
    expiration_date: Option<String>,
}

impl From<WhoisWire> for WhoisRecord {
    fn from(w: WhoisWire) -> Self {
        Self {
            domain_name: w.domain_name,
            registrar: w.registrar,
            creation_date: w.creation_date,
            updated_date: w.updated_date,
            expiration_date: w.expiration_date,
        }
    }
}

/// WHOIS fields arrive as strings, lists of strings, numbers, null, or the
/// literal `"None"`. Lists collapse to their first entry.
fn registry_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn flatten(value: Value) -> Option<String> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() || s == "None" {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Value::Array(items) => items.into_iter().find_map(flatten),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(flatten))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::SafetyVerdict;
    use serde_json::json;

    fn parse(value: Value) -> Result<RemoteThreatPayload, ThreatIntelError> {
        parse_payload(200, value.to_string().as_bytes())
    }

    #[test]
    fn full_payload_parses_every_section() {
        let payload = parse(json!({
            "certificate": {
                "valid": true,
                "issuer": "Let's Encrypt",
                "common_name": "example.com",
                "valid_from": "2024-01-01",
                "valid_until": "2024-04-01"
            },
            "risk_level": "Low Risk",
            "feedback": "Certificate looks fine.",
            "google_safe_browsing": { "safe": true },
            "virustotal_info": { "malicious": 0, "suspicious": 1, "raw": { "harmless": 70, "suspicious": 1 } },
            "whois_info": {
                "domain_name": ["EXAMPLE.COM", "example.com"],
                "registrar": "RESERVED-Internet Assigned Numbers Authority",
                "creation_date": "1995-08-14 04:00:00",
                "updated_date": "None",
                "expiration_date": null
            }
        }))
        .unwrap();

        let cert = payload.certificate.unwrap().unwrap();
        assert!(cert.valid);
        assert_eq!(cert.issuer.as_deref(), Some("Let's Encrypt"));
        assert_eq!(payload.risk_level.as_deref(), Some("Low Risk"));
        assert_eq!(payload.safe_browsing.unwrap().unwrap().verdict, SafetyVerdict::Safe);

        let scan = payload.engine_scan.unwrap().unwrap();
        assert_eq!(scan.suspicious, 1);
        assert_eq!(scan.total_engines(), Some(71));

        let whois = payload.whois.unwrap().unwrap();
        assert_eq!(whois.domain_name.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(whois.updated_date, None);
        assert_eq!(whois.expiration_date, None);
    }

    #[test]
    fn missing_and_null_sections_are_absent() {
        let payload = parse(json!({ "certificate": null })).unwrap();
        assert_eq!(payload, RemoteThreatPayload::default());
    }

    #[test]
    fn a_broken_section_does_not_spoil_the_others() {
        let payload = parse(json!({
            "certificate": { "valid": "definitely" },
            "google_safe_browsing": { "safe": false, "details": [{ "threatType": "MALWARE", "platformType": "ANY_PLATFORM" }] },
            "virustotal_info": { "error": "quota exceeded" },
            "whois_info": { "creation_date": "2024-01-01" }
        }))
        .unwrap();

        assert!(payload.certificate.unwrap_err().contains("certificate"));
        assert_eq!(payload.engine_scan, Err("quota exceeded".to_string()));
        let gsb = payload.safe_browsing.unwrap().unwrap();
        assert_eq!(gsb.verdict, SafetyVerdict::Unsafe);
        assert_eq!(gsb.threat_types(), vec!["MALWARE"]);
        assert!(payload.whois.unwrap().is_some());
    }

    #[test]
    fn null_safe_flag_is_unknown() {
        let payload = parse(json!({ "google_safe_browsing": { "safe": null } })).unwrap();
        assert_eq!(payload.safe_browsing.unwrap().unwrap().verdict, SafetyVerdict::Unknown);
    }

    #[test]
    fn top_level_error_is_a_remote_error() {
        let err = parse(json!({ "error": "Hostname is required" })).unwrap_err();
        assert_eq!(
            err,
            ThreatIntelError::RemoteError {
                status: 200,
                message: "Hostname is required".to_string()
            }
        );
    }

    #[test]
    fn non_object_bodies_degrade_every_section() {
        for body in [&b"<html>oops</html>"[..], &b"[1, 2, 3]"[..]] {
            let payload = parse_payload(200, body).unwrap();
            assert!(payload.certificate.is_err());
            assert!(payload.safe_browsing.is_err());
            assert!(payload.engine_scan.is_err());
            assert!(payload.whois.is_err());
        }
    }
}
