//! Publisher: sends documents to the upload proxy.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use supplydna_core::constants::{ERROR_FIELD, IPFS_HASH_FIELD};
use supplydna_core::error::{Result, SupplyDnaError};
use supplydna_core::traits::ContentPublisher;
use supplydna_core::types::{ContentId, MetadataDocument};

use crate::config::StorageConfig;

/// Posts metadata documents to the upload proxy.
///
/// One request per call: no retry, no cache, no deduplication.
pub struct Publisher {
    endpoint: Option<String>,
    http_client: reqwest::Client,
}

impl Publisher {
    /// Creates a publisher from the storage configuration.
    ///
    /// A missing upload endpoint is allowed here but logged; every publish
    /// then fails with a configuration error.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate_upload()?;
        if config.upload_endpoint.is_none() {
            warn!("Upload endpoint is not set; registration will fail");
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.upload_timeout())
            .build()
            .map_err(|e| SupplyDnaError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.upload_endpoint.clone(),
            http_client,
        })
    }

    /// Returns the configured upload endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Validates and publishes any serializable value.
    pub async fn publish_json<T: Serialize + ?Sized>(&self, document: &T) -> Result<ContentId> {
        let document = MetadataDocument::from_serializable(document)?;
        self.publish(&document).await
    }

    /// Publishes a document and returns the CID assigned by the pinning backend.
    pub async fn publish(&self, document: &MetadataDocument) -> Result<ContentId> {
        self.publish_with_cancel(document, &CancellationToken::new()).await
    }

    /// Publishes a document, giving up early if `cancel` fires.
    #[instrument(skip_all, fields(endpoint = self.endpoint.as_deref().unwrap_or("<unset>")))]
    pub async fn publish_with_cancel(
        &self,
        document: &MetadataDocument,
        cancel: &CancellationToken,
    ) -> Result<ContentId> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            SupplyDnaError::ConfigError("upload endpoint is not configured".into())
        })?;
        let body = document.to_bytes()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SupplyDnaError::Cancelled { operation: "publish".into() }),
            result = self.upload(endpoint, body) => result,
        }
    }

    async fn upload(&self, endpoint: &str, body: Vec<u8>) -> Result<ContentId> {
        let transport = |e: reqwest::Error| SupplyDnaError::TransportFailure {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .http_client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let message = error_message(&text)
                .unwrap_or_else(|| format!("Upload failed with status {}", status.as_u16()));
            warn!(%status, %message, "Upload rejected");
            return Err(SupplyDnaError::UploadRejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        match ipfs_hash(&text) {
            Some(cid) => {
                info!(%cid, "Uploaded metadata to IPFS");
                Ok(cid)
            }
            None => {
                warn!(body = %text, "No IPFS hash in upload response");
                Err(SupplyDnaError::UploadIncomplete {
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ContentPublisher for Publisher {
    async fn publish(&self, document: &MetadataDocument) -> Result<ContentId> {
        Publisher::publish(self, document).await
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get(ERROR_FIELD)?
        .as_str()
        .filter(|m| !m.is_empty())
        .map(String::from)
}

fn ipfs_hash(body: &str) -> Option<ContentId> {
    let value: Value = serde_json::from_str(body).ok()?;
    ContentId::parse(value.get(IPFS_HASH_FIELD)?.as_str()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn publisher_for(server: &MockServer) -> Publisher {
        let config = StorageConfig::default()
            .with_upload_endpoint(format!("{}/api/pinata-upload", server.uri()));
        Publisher::new(&config).unwrap()
    }

    fn component_doc() -> Value {
        json!({
            "name": "SupplyDNA Component - CMP-001",
            "attributes": [{ "trait_type": "Supplier", "value": "Acme" }]
        })
    }

    #[tokio::test]
    async fn test_publish_returns_ipfs_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pinata-upload"))
            .and(header("content-type", "application/json"))
            .and(body_json(component_doc()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "QmComponent" })))
            .expect(1)
            .mount(&server)
            .await;

        let cid = publisher_for(&server).await.publish_json(&component_doc()).await.unwrap();
        assert_eq!(cid.as_str(), "QmComponent");
    }

    #[tokio::test]
    async fn test_empty_documents_never_hit_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "QmX" })))
            .expect(0)
            .mount(&server)
            .await;

        let publisher = publisher_for(&server).await;
        for doc in [json!({}), Value::Null] {
            let err = publisher.publish_json(&doc).await.unwrap_err();
            assert!(matches!(err, SupplyDnaError::InvalidInput(_)), "{:?}", err);
        }
        let missing: Option<Value> = None;
        assert!(matches!(
            publisher.publish_json(&missing).await,
            Err(SupplyDnaError::InvalidInput(_))
        ));

        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_message_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "disk full" })))
            .mount(&server)
            .await;

        let err = publisher_for(&server).await.publish_json(&component_doc()).await.unwrap_err();
        match &err {
            SupplyDnaError::UploadRejected { status, message, .. } => {
                assert_eq!(*status, 500);
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_rejection_without_error_field_uses_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = publisher_for(&server).await.publish_json(&component_doc()).await.unwrap_err();
        assert!(matches!(
            err,
            SupplyDnaError::UploadRejected { status: 502, ref message, .. }
                if message == "Upload failed with status 502"
        ));
    }

    #[tokio::test]
    async fn test_missing_hash_is_incomplete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = publisher_for(&server).await.publish_json(&component_doc()).await.unwrap_err();
        assert!(matches!(err, SupplyDnaError::UploadIncomplete { .. }));
    }

    #[tokio::test]
    async fn test_empty_or_non_json_success_is_incomplete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "IpfsHash": "" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let publisher = publisher_for(&server).await;
        for _ in 0..2 {
            assert!(matches!(
                publisher.publish_json(&component_doc()).await,
                Err(SupplyDnaError::UploadIncomplete { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = StorageConfig::default()
            .with_upload_endpoint(format!("http://127.0.0.1:{}/upload", port));
        let err = Publisher::new(&config).unwrap().publish_json(&component_doc()).await.unwrap_err();
        assert!(matches!(err, SupplyDnaError::TransportFailure { ref endpoint, .. } if endpoint.ends_with("/upload")));
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails_eagerly() {
        let publisher = Publisher::new(&StorageConfig::default()).unwrap();
        assert!(publisher.endpoint().is_none());
        assert!(matches!(
            publisher.publish_json(&component_doc()).await,
            Err(SupplyDnaError::ConfigError(_))
        ));
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let config = StorageConfig::default().with_upload_endpoint("/api/pinata-upload");
        assert!(matches!(Publisher::new(&config), Err(SupplyDnaError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_cancelled_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "IpfsHash": "QmLate" }))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let publisher = publisher_for(&server).await;
        let doc = MetadataDocument::new(component_doc()).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = publisher.publish_with_cancel(&doc, &cancel).await.unwrap_err();
        assert!(matches!(err, SupplyDnaError::Cancelled { .. }));
    }
}
