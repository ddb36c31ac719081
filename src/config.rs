//! Remote endpoint configuration.
//!
//! The endpoint URL and access credential are supplied out-of-band; their
//! absence is a startup-fatal configuration error, never a runtime sync
//! concern.

use crate::error::SyncError;

/// Environment variable holding the remote endpoint URL.
pub const ENV_REMOTE_URL: &str = "DRIVESELL_REMOTE_URL";
/// Environment variable holding the remote access credential.
pub const ENV_REMOTE_KEY: &str = "DRIVESELL_REMOTE_KEY";

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(base_url: &str, api_key: &str) -> Result<RemoteConfig, SyncError> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(SyncError::Config("remote URL is not configured".into()));
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SyncError::Config(
                "remote access credential is not configured".into(),
            ));
        }
        Ok(RemoteConfig {
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Read the configuration from `DRIVESELL_REMOTE_URL` /
    /// `DRIVESELL_REMOTE_KEY`.
    pub fn from_env() -> Result<RemoteConfig, SyncError> {
        let url = std::env::var(ENV_REMOTE_URL)
            .map_err(|_| SyncError::Config(format!("{ENV_REMOTE_URL} is not set")))?;
        let key = std::env::var(ENV_REMOTE_KEY)
            .map_err(|_| SyncError::Config(format!("{ENV_REMOTE_KEY} is not set")))?;
        RemoteConfig::new(&url, &key)
    }
}

/// Normalize the remote base URL:
/// - strip trailing slashes
/// - strip a trailing `/rest/v1` segment (callers paste full REST URLs)
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /rest/v1
    if url.ends_with("/rest/v1") {
        url.truncate(url.len() - "/rest/v1".len());
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("myproject.example.co"),
            "https://myproject.example.co"
        );
        assert_eq!(
            normalize_base_url("https://myproject.example.co/"),
            "https://myproject.example.co"
        );
        assert_eq!(
            normalize_base_url("https://myproject.example.co/rest/v1/"),
            "https://myproject.example.co"
        );
        assert_eq!(
            normalize_base_url("localhost:54321"),
            "http://localhost:54321"
        );
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    fn test_missing_values_are_config_errors() {
        assert!(matches!(
            RemoteConfig::new("", "key"),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            RemoteConfig::new("https://example.co", "  "),
            Err(SyncError::Config(_))
        ));

        let config = RemoteConfig::new("example.co/", "anon-key").unwrap();
        assert_eq!(config.base_url, "https://example.co");
        assert_eq!(config.api_key, "anon-key");
    }
}
