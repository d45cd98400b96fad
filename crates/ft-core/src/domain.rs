//! Hostname extraction for domain-mode reporting.

use url::Url;

/// Extracts the hostname from a URL.
///
/// URLs without a host (`about:blank`, `data:` URLs) yield an empty string.
/// Unparseable input is logged and returned unchanged, so callers always get
/// a usable key.
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(err) => {
            tracing::warn!(url, error = %err, "invalid URL, using it as the domain");
            url.to_string()
        }
    }
}
