//! Content identifiers and publishable documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::IPFS_URI_SCHEME;
use crate::error::{Result, SupplyDnaError};

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT IDENTIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier assigned by the pinning backend to a stored document.
///
/// Opaque: the only check is that it is non-empty. Equality is plain string
/// equality. `ipfs://` and `/ipfs/` prefixes, as found in NFT token URIs, are
/// stripped on parse.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Parses an identifier or an `ipfs://` / `/ipfs/` URI.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let bare = trimmed
            .strip_prefix(IPFS_URI_SCHEME)
            .or_else(|| trimmed.strip_prefix("/ipfs/"))
            .unwrap_or(trimmed);

        if bare.is_empty() {
            return Err(SupplyDnaError::InvalidInput(
                "content identifier cannot be empty".into(),
            ));
        }

        Ok(Self(bare.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `ipfs://` URI form used in NFT token URIs.
    pub fn to_uri(&self) -> String {
        format!("{}{}", IPFS_URI_SCHEME, self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = SupplyDnaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = SupplyDnaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ContentId> for String {
    fn from(cid: ContentId) -> Self {
        cid.0
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// METADATA DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A JSON document that is allowed to be published.
///
/// No schema is enforced. The document must be a non-empty object or array;
/// `null`, `{}`, `[]` and bare scalars are rejected.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataDocument(Value);

impl MetadataDocument {
    /// Wraps a JSON value after checking it is publishable.
    pub fn new(value: Value) -> Result<Self> {
        match &value {
            Value::Null => Err(SupplyDnaError::InvalidInput(
                "no metadata provided for IPFS upload".into(),
            )),
            Value::Object(map) if map.is_empty() => Err(SupplyDnaError::InvalidInput(
                "metadata object is empty".into(),
            )),
            Value::Array(items) if items.is_empty() => Err(SupplyDnaError::InvalidInput(
                "metadata array is empty".into(),
            )),
            Value::Object(_) | Value::Array(_) => Ok(Self(value)),
            _ => Err(SupplyDnaError::InvalidInput(
                "metadata must be a JSON object or array".into(),
            )),
        }
    }

    /// Serializes any value and wraps the result.
    ///
    /// `None` serializes to `null` and is rejected like any other empty document.
    pub fn from_serializable<T: Serialize + ?Sized>(document: &T) -> Result<Self> {
        Self::new(serde_json::to_value(document)?)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the document, returning the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Serializes the document to the bytes sent over the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

impl TryFrom<Value> for MetadataDocument {
    type Error = SupplyDnaError;

    fn try_from(value: Value) -> Result<Self> {
        Self::new(value)
    }
}
