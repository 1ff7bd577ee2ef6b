// src/core/normalizer.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::core::errors::InvalidUrl;
use crate::core::models::NormalizedUrl;

/// Matches an explicit `scheme://` prefix.
static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme prefix pattern is valid")
});

/// Parses user input into a scheme-qualified URL with a host.
///
/// Input without an explicit scheme is treated as `https://<input>`.
/// Anything that still fails to parse, or parses without a host, is rejected.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, InvalidUrl> {
    let trimmed = raw.trim();
    let candidate = if SCHEME_PREFIX.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| InvalidUrl {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => {
            return Err(InvalidUrl {
                input: raw.to_string(),
                reason: "URL has no host".to_string(),
            });
        }
    };

    debug!(%url, %host, "Normalized input URL.");
    Ok(NormalizedUrl {
        scheme: url.scheme().to_string(),
        host,
        url,
    })
}
