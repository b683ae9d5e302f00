//! Pinata client used by the upload proxy.
//!
//! Pins JSON documents through the legacy `pinJSONToIPFS` endpoint with an
//! API key / secret pair. Only the proxy holds these credentials.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use supplydna_core::constants::DEFAULT_PINATA_API_URL;
use supplydna_core::error::{Result, SupplyDnaError};
use supplydna_core::types::{ContentId, MetadataDocument};

/// Pinata client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinataConfig {
    /// Pinata REST API base URL
    pub api_url: String,
    /// Pinata API key
    pub api_key: Option<String>,
    /// Pinata secret API key
    pub secret_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PINATA_API_URL.into(),
            api_key: None,
            secret_key: None,
            timeout_seconds: 30,
        }
    }
}

impl PinataConfig {
    /// Creates a config with Pinata credentials.
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            secret_key: Some(secret_key.into()),
            ..Default::default()
        }
    }

    /// Points the client at a different API base (tests, self-hosted mocks).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Returns true when both credentials are present.
    pub fn has_credentials(&self) -> bool {
        matches!((&self.api_key, &self.secret_key), (Some(k), Some(s)) if !k.is_empty() && !s.is_empty())
    }
}

/// Pinata `pinJSONToIPFS` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinResponse {
    /// CID of the pinned document
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
    /// Pinned size in bytes
    #[serde(rename = "PinSize", default)]
    pub pin_size: u64,
    /// Pin timestamp as reported by Pinata
    #[serde(rename = "Timestamp", default)]
    pub timestamp: String,
}

/// HTTP client for the Pinata pinning API.
pub struct PinataClient {
    config: PinataConfig,
    http_client: reqwest::Client,
}

impl PinataClient {
    /// Creates a new Pinata client.
    pub fn with_config(config: PinataConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SupplyDnaError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns true when the client can pin.
    pub fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.config.api_key, &self.config.secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok((key.as_str(), secret.as_str()))
            }
            _ => Err(SupplyDnaError::ConfigError(
                "Pinata API keys not configured. Please set PINATA_API_KEY and PINATA_SECRET_API_KEY environment variables.".into(),
            )),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Pins a JSON document and returns its CID.
    #[instrument(skip(self, document))]
    pub async fn pin_json(&self, document: &MetadataDocument, name: Option<&str>) -> Result<ContentId> {
        let (api_key, secret_key) = self.credentials()?;

        let mut body = serde_json::json!({ "pinataContent": document.as_value() });
        if let Some(n) = name {
            body["pinataMetadata"] = serde_json::json!({ "name": n });
        }

        let response = self
            .http_client
            .post(self.endpoint("/pinning/pinJSONToIPFS"))
            .header("pinata_api_key", api_key)
            .header("pinata_secret_api_key", secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SupplyDnaError::PinningFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Pinata rejected pin");
            return Err(SupplyDnaError::PinningFailed(format!(
                "status {}: {}",
                status,
                pinata_reason(&text)
            )));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| SupplyDnaError::PinningFailed(format!("malformed response: {}", e)))?;

        let cid = ContentId::parse(&pinned.ipfs_hash)
            .map_err(|_| SupplyDnaError::PinningFailed("response carried an empty IpfsHash".into()))?;

        debug!(%cid, pin_size = pinned.pin_size, "Pinned JSON to Pinata");
        Ok(cid)
    }

    /// Checks the configured credentials against Pinata.
    #[instrument(skip(self))]
    pub async fn test_authentication(&self) -> Result<()> {
        let (api_key, secret_key) = self.credentials()?;

        let response = self
            .http_client
            .get(self.endpoint("/data/testAuthentication"))
            .header("pinata_api_key", api_key)
            .header("pinata_secret_api_key", secret_key)
            .send()
            .await
            .map_err(|e| SupplyDnaError::PinningFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SupplyDnaError::PinningFailed(format!(
                "authentication failed with status {}: {}",
                status,
                pinata_reason(&text)
            )));
        }

        Ok(())
    }
}

/// Pulls a readable reason out of a Pinata error body.
///
/// Pinata answers either `{"error": "..."}` or `{"error": {"reason", "details"}}`.
fn pinata_reason(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let reason = parsed.as_ref().and_then(|v| match &v["error"] {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("details")
            .or_else(|| obj.get("reason"))
            .and_then(Value::as_str)
            .map(String::from),
        _ => None,
    });
    reason.unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn doc() -> MetadataDocument {
        MetadataDocument::new(json!({ "name": "SupplyDNA Component - CMP-001" })).unwrap()
    }

    fn client(server: &MockServer) -> PinataClient {
        PinataClient::with_config(PinataConfig::new("key", "secret").with_api_url(server.uri())).unwrap()
    }

    #[test]
    fn test_credentials_required() {
        assert!(!PinataConfig::default().has_credentials());
        assert!(!PinataConfig::new("", "secret").has_credentials());
        assert!(PinataConfig::new("key", "secret").has_credentials());
    }

    #[tokio::test]
    async fn test_pin_json_without_credentials() {
        let client = PinataClient::with_config(PinataConfig::default()).unwrap();
        let err = client.pin_json(&doc(), None).await.unwrap_err();
        assert!(matches!(err, SupplyDnaError::ConfigError(msg) if msg.contains("PINATA_API_KEY")));
    }

    #[tokio::test]
    async fn test_pin_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pinning/pinJSONToIPFS"))
            .and(header("pinata_api_key", "key"))
            .and(header("pinata_secret_api_key", "secret"))
            .and(body_json(json!({
                "pinataContent": { "name": "SupplyDNA Component - CMP-001" },
                "pinataMetadata": { "name": "CMP-001" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IpfsHash": "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
                "PinSize": 64,
                "Timestamp": "2024-08-01T10:00:00.000Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cid = client(&server).pin_json(&doc(), Some("CMP-001")).await.unwrap();
        assert_eq!(cid.as_str(), "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
    }

    #[tokio::test]
    async fn test_pin_json_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "reason": "INVALID_CREDENTIALS", "details": "Invalid API key provided" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).pin_json(&doc(), None).await.unwrap_err();
        match err {
            SupplyDnaError::PinningFailed(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Invalid API key provided"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authentication_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/testAuthentication"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Congratulations! You are communicating with the Pinata API!"
            })))
            .mount(&server)
            .await;

        assert!(client(&server).test_authentication().await.is_ok());
    }

    #[test]
    fn test_pinata_reason_shapes() {
        assert_eq!(pinata_reason(r#"{"error":"boom"}"#), "boom");
        assert_eq!(pinata_reason(r#"{"error":{"reason":"R"}}"#), "R");
        assert_eq!(pinata_reason("plain text"), "plain text");
    }
}
