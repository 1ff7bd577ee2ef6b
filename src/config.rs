//! Runtime configuration for the analyzer.
//!
//! Defaults cover the public aggregation endpoint and the built-in rule
//! tables. Environment variables can override each value; a JSON rule file
//! can replace the tables wholesale.

use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::core::errors::ConfigError;
use crate::core::knowledge_base::RuleTables;

pub const DEFAULT_ENDPOINT: &str = "https://ecotrust-backend.onrender.com/api/check-ssl";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

pub const ENDPOINT_ENV: &str = "URL_RISK_ENDPOINT";
pub const TIMEOUT_ENV: &str = "URL_RISK_TIMEOUT_SECS";
pub const RULES_FILE_ENV: &str = "URL_RISK_RULES_FILE";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Threat-intel aggregation endpoint (receives `{ "hostname": ... }`).
    pub endpoint: Url,
    /// Hard deadline for the whole remote exchange.
    pub timeout: Duration,
    pub user_agent: String,
    pub rules: RuleTables,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            rules: RuleTables::builtin(),
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

impl AnalyzerConfig {
    /// Defaults overlaid with whatever the process environment sets.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|var| std::env::var(var).ok())
    }

    /// Applies overrides from any variable lookup; split out so tests do not
    /// have to touch the real environment.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENDPOINT_ENV) {
            self = self.with_endpoint(&raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self = self.with_timeout_secs(&raw)?;
        }
        if let Some(path) = lookup(RULES_FILE_ENV) {
            self.rules = load_rules(Path::new(&path))?;
        }
        Ok(self)
    }

    pub fn with_endpoint(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.endpoint = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidVar {
            var: ENDPOINT_ENV,
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    pub fn with_timeout_secs(mut self, raw: &str) -> Result<Self, ConfigError> {
        let secs: f64 = raw.trim().parse().map_err(|e: std::num::ParseFloatError| {
            ConfigError::InvalidVar {
                var: TIMEOUT_ENV,
                reason: e.to_string(),
            }
        })?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::InvalidVar {
                var: TIMEOUT_ENV,
                reason: format!("timeout must be a positive number of seconds, got {secs}"),
            });
        }
        self.timeout = Duration::from_secs_f64(secs);
        Ok(self)
    }
}

/// Reads a JSON rule-table document.
pub fn load_rules(path: &Path) -> Result<RuleTables, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::RuleFileRead {
        path: path.display().to_string(),
        source,
    })?;
    let rules: RuleTables =
        serde_json::from_str(&text).map_err(|source| ConfigError::RuleFileParse {
            path: path.display().to_string(),
            source,
        })?;
    info!(path = %path.display(), version = %rules.version, "Loaded rule tables from file.");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_sane() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.rules, RuleTables::builtin());
        assert!(config.user_agent.starts_with("url-risk-scanner/"));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = AnalyzerConfig::default()
            .overlay(lookup(&[
                (ENDPOINT_ENV, "http://127.0.0.1:9000/api/check-ssl"),
                (TIMEOUT_ENV, "2.5"),
            ]))
            .unwrap();
        assert_eq!(config.endpoint.port(), Some(9000));
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn bad_values_are_errors_not_defaults() {
        assert!(AnalyzerConfig::default().overlay(lookup(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(AnalyzerConfig::default().overlay(lookup(&[(TIMEOUT_ENV, "0")])).is_err());
        assert!(AnalyzerConfig::default().overlay(lookup(&[(ENDPOINT_ENV, "not a url")])).is_err());
    }

    #[test]
    fn missing_rule_file_is_reported() {
        let err = AnalyzerConfig::default()
            .overlay(lookup(&[(RULES_FILE_ENV, "/definitely/not/here.json")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::RuleFileRead { .. }));
    }

    #[test]
    fn rule_file_replaces_tables() {
        let path = std::env::temp_dir().join(format!("url-risk-rules-{}.json", std::process::id()));
        let mut rules = RuleTables::builtin().with_whitelisted_hosts(["intranet.example"]);
        rules.version = "test-1".into();
        std::fs::write(&path, serde_json::to_string(&rules).unwrap()).unwrap();

        let loaded = load_rules(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, rules);
    }

    #[test]
    fn malformed_rule_file_names_the_path() {
        let path = std::env::temp_dir().join(format!("url-risk-bad-rules-{}.json", std::process::id()));
        std::fs::write(&path, "{ \"version\": 7 }").unwrap();

        let err = load_rules(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        match err {
            ConfigError::RuleFileParse { path: shown, .. } => {
                assert_eq!(shown, path.display().to_string())
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
