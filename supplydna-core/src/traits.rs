//! Common traits for SupplyDNA.
//!
//! The registration and display flows only talk to storage through these
//! interfaces, so tests and alternative backends can stand in for IPFS.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContentId, MetadataDocument};

/// Publishes documents to content-addressed storage.
#[async_trait]
pub trait ContentPublisher: Send + Sync {
    /// Stores the document and returns the identifier assigned by the backend.
    ///
    /// One attempt, no retry.
    async fn publish(&self, document: &MetadataDocument) -> Result<ContentId>;
}

/// Retrieves documents from content-addressed storage.
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Fetches the document stored under `cid`.
    async fn retrieve(&self, cid: &ContentId) -> Result<serde_json::Value>;
}
