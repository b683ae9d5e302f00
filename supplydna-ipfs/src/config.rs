//! Storage configuration shared by the publisher and retriever.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use supplydna_core::constants::{
    DEFAULT_GATEWAY_TIMEOUT_MS, DEFAULT_IPFS_GATEWAYS, DEFAULT_UPLOAD_TIMEOUT_MS,
};
use supplydna_core::error::{Result, SupplyDnaError};

/// Storage layer configuration.
///
/// Passed explicitly to [`crate::Publisher`] and [`crate::Retriever`]; nothing
/// reads process-wide state after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Upload proxy URL. Publishing fails with a config error when unset.
    pub upload_endpoint: Option<String>,
    /// Gateway prefixes, tried in order. `{gateway}{cid}` is the document URL.
    pub gateways: Vec<String>,
    /// Timeout for one gateway attempt, in milliseconds
    pub per_gateway_timeout_ms: u64,
    /// Timeout for the upload round trip, in milliseconds
    pub upload_timeout_ms: u64,
    /// Check retrieved bytes against the CID before accepting them
    pub verify_integrity: bool,
    /// Share one gateway fan-out between concurrent retrievals of the same CID
    pub collapse_in_flight: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: None,
            gateways: DEFAULT_IPFS_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            per_gateway_timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
            upload_timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
            verify_integrity: false,
            collapse_in_flight: false,
        }
    }
}

impl StorageConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    ///
    /// Recognized variables: `SUPPLYDNA_UPLOAD_ENDPOINT`, `SUPPLYDNA_IPFS_GATEWAYS`
    /// (comma separated), `SUPPLYDNA_GATEWAY_TIMEOUT_MS`, `SUPPLYDNA_UPLOAD_TIMEOUT_MS`,
    /// `SUPPLYDNA_VERIFY_INTEGRITY`, `SUPPLYDNA_COLLAPSE_IN_FLIGHT`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let upload_endpoint = lookup("SUPPLYDNA_UPLOAD_ENDPOINT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if upload_endpoint.is_none() {
            warn!("SUPPLYDNA_UPLOAD_ENDPOINT is not set; publishing will fail");
        }

        let gateways = lookup("SUPPLYDNA_IPFS_GATEWAYS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.gateways);

        Self {
            upload_endpoint,
            gateways,
            per_gateway_timeout_ms: parse_or(
                &lookup,
                "SUPPLYDNA_GATEWAY_TIMEOUT_MS",
                defaults.per_gateway_timeout_ms,
            ),
            upload_timeout_ms: parse_or(
                &lookup,
                "SUPPLYDNA_UPLOAD_TIMEOUT_MS",
                defaults.upload_timeout_ms,
            ),
            verify_integrity: flag(&lookup, "SUPPLYDNA_VERIFY_INTEGRITY"),
            collapse_in_flight: flag(&lookup, "SUPPLYDNA_COLLAPSE_IN_FLIGHT"),
        }
    }

    /// Sets the upload proxy URL.
    pub fn with_upload_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.upload_endpoint = Some(endpoint.into());
        self
    }

    /// Replaces the gateway list.
    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-gateway timeout.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.per_gateway_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables integrity checking of retrieved content.
    pub fn with_integrity_check(mut self, enabled: bool) -> Self {
        self.verify_integrity = enabled;
        self
    }

    /// Enables or disables collapsing of concurrent identical retrievals.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.collapse_in_flight = enabled;
        self
    }

    /// Per-gateway timeout as a `Duration`.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.per_gateway_timeout_ms)
    }

    /// Upload timeout as a `Duration`.
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    /// Gateway prefixes normalized to end with `/`.
    pub fn gateway_prefixes(&self) -> Vec<String> {
        self.gateways
            .iter()
            .map(|g| {
                let g = g.trim();
                if g.ends_with('/') {
                    g.to_string()
                } else {
                    format!("{}/", g)
                }
            })
            .collect()
    }

    /// Checks the configuration is usable by both the publisher and the retriever.
    pub fn validate(&self) -> Result<()> {
        self.validate_gateways()?;
        self.validate_upload()
    }

    /// Checks the retrieval side: gateway list and per-gateway timeout.
    ///
    /// The upload endpoint is not consulted, so a retriever can be built from
    /// a config whose endpoint only makes sense to a browser.
    pub fn validate_gateways(&self) -> Result<()> {
        if self.gateways.is_empty() {
            return Err(SupplyDnaError::ConfigError("gateway list is empty".into()));
        }
        if self.per_gateway_timeout_ms == 0 {
            return Err(SupplyDnaError::ConfigError("gateway timeout must be positive".into()));
        }
        for gateway in &self.gateways {
            Url::parse(gateway.trim()).map_err(|e| {
                SupplyDnaError::ConfigError(format!("invalid gateway URL '{}': {}", gateway, e))
            })?;
        }
        Ok(())
    }

    /// Checks the publishing side: upload timeout and, when set, an absolute endpoint.
    pub fn validate_upload(&self) -> Result<()> {
        if self.upload_timeout_ms == 0 {
            return Err(SupplyDnaError::ConfigError("upload timeout must be positive".into()));
        }
        if let Some(endpoint) = &self.upload_endpoint {
            Url::parse(endpoint).map_err(|e| {
                SupplyDnaError::ConfigError(format!("invalid upload endpoint '{}': {}", endpoint, e))
            })?;
        }
        Ok(())
    }
}

fn parse_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!(key, value = %raw, default, "Ignoring invalid value");
                default
            }
        },
        None => default,
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.gateways.len(), 4);
        assert_eq!(config.gateways[0], "https://ipfs.io/ipfs/");
        assert_eq!(config.per_gateway_timeout_ms, 5000);
        assert!(config.upload_endpoint.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("SUPPLYDNA_UPLOAD_ENDPOINT", "http://localhost:5001/upload"),
            ("SUPPLYDNA_IPFS_GATEWAYS", "https://a.example/ipfs/, https://b.example/ipfs/ ,"),
            ("SUPPLYDNA_GATEWAY_TIMEOUT_MS", "250"),
            ("SUPPLYDNA_VERIFY_INTEGRITY", "true"),
        ]));

        assert_eq!(config.upload_endpoint.as_deref(), Some("http://localhost:5001/upload"));
        assert_eq!(config.gateways, ["https://a.example/ipfs/", "https://b.example/ipfs/"]);
        assert_eq!(config.gateway_timeout(), Duration::from_millis(250));
        assert!(config.verify_integrity);
        assert!(!config.collapse_in_flight);
    }

    #[test]
    fn test_from_lookup_invalid_values_fall_back() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("SUPPLYDNA_GATEWAY_TIMEOUT_MS", "soon"),
            ("SUPPLYDNA_UPLOAD_TIMEOUT_MS", "0"),
            ("SUPPLYDNA_IPFS_GATEWAYS", " , "),
        ]));
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn test_gateway_prefixes_normalized() {
        let config = StorageConfig::default()
            .with_gateways(["https://a.example/ipfs", "https://b.example/ipfs/"]);
        assert_eq!(
            config.gateway_prefixes(),
            ["https://a.example/ipfs/", "https://b.example/ipfs/"]
        );
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let empty = StorageConfig::default().with_gateways(Vec::<String>::new());
        assert!(empty.validate().is_err());

        let bad_url = StorageConfig::default().with_gateways(["not a url"]);
        assert!(bad_url.validate().is_err());

        let zero = StorageConfig::default().with_gateway_timeout(Duration::ZERO);
        assert!(zero.validate().is_err());

        let relative = StorageConfig::default().with_upload_endpoint("/api/pinata-upload");
        assert!(relative.validate().is_err());
    }

    #[test]
    fn test_relative_endpoint_only_fails_upload_side() {
        let config = StorageConfig::default().with_upload_endpoint("/api/pinata-upload");
        assert!(config.validate_gateways().is_ok());
        assert!(matches!(config.validate_upload(), Err(SupplyDnaError::ConfigError(_))));
    }

    #[test]
    fn test_huge_gateway_timeout_saturates() {
        let config = StorageConfig::default().with_gateway_timeout(Duration::MAX);
        assert_eq!(config.per_gateway_timeout_ms, u64::MAX);
    }
}
