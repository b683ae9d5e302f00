//! Constants for SupplyDNA metadata storage.

// ═══════════════════════════════════════════════════════════════════════════════
// IPFS GATEWAYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Public gateways tried, in this order, when retrieving a document.
/// Each entry is a prefix: the CID is appended verbatim.
pub const DEFAULT_IPFS_GATEWAYS: [&str; 4] = [
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

/// Per-gateway timeout for a single retrieval attempt, in milliseconds.
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 5_000;

/// Timeout for the single upload round trip, in milliseconds.
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 30_000;

// ═══════════════════════════════════════════════════════════════════════════════
// UPLOAD PROXY
// ═══════════════════════════════════════════════════════════════════════════════

/// Upload path served by the deployed proxy.
pub const UPLOAD_PATH: &str = "/api/pinata-upload";

/// Upload path served by the local development proxy.
pub const LOCAL_UPLOAD_PATH: &str = "/upload";

/// Default port of the local upload proxy.
pub const DEFAULT_PROXY_PORT: u16 = 5001;

/// JSON field carrying the content identifier in upload responses.
pub const IPFS_HASH_FIELD: &str = "IpfsHash";

/// JSON field carrying the message in upload error responses.
pub const ERROR_FIELD: &str = "error";

/// Pinata REST API base URL.
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT ADDRESSING
// ═══════════════════════════════════════════════════════════════════════════════

/// URI scheme used in NFT token URIs.
pub const IPFS_URI_SCHEME: &str = "ipfs://";

/// Largest file the default IPFS chunker stores in a single block.
/// Bigger documents are split into a DAG and can't be checked from the body alone.
pub const UNIXFS_CHUNK_SIZE: usize = 262_144;

/// Multicodec code for raw binary blocks.
pub const CODEC_RAW: u64 = 0x55;

/// Multicodec code for DAG-PB (UnixFS) blocks.
pub const CODEC_DAG_PB: u64 = 0x70;

/// Multihash code for sha2-256.
pub const MULTIHASH_SHA2_256: u64 = 0x12;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT METADATA CONVENTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix of the NFT name for registered components.
pub const COMPONENT_NAME_PREFIX: &str = "SupplyDNA Component - ";

/// Placeholder image shown for components without artwork.
pub const COMPONENT_PLACEHOLDER_IMAGE: &str =
    "https://via.placeholder.com/400x400/3498db/ffffff?text=SupplyDNA+Component";

/// External link attached to component NFTs.
pub const COMPONENT_EXTERNAL_URL: &str = "https://supplydna.com";

/// Background color (hex, no leading `#`) of component NFTs.
pub const COMPONENT_BACKGROUND_COLOR: &str = "3498db";

/// Minimum length of a component identifier.
pub const MIN_COMPONENT_ID_LEN: usize = 3;
