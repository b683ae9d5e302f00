//! DTOs for proxy responses.

use serde::{Deserialize, Serialize};

/// Response for a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// CID of the pinned document
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
}

/// Response for the health check.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether Pinata credentials are configured
    pub pinata_configured: bool,
}
