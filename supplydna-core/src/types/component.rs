//! Component registration records and their NFT metadata.
//!
//! The storage layer treats documents as opaque; this is the shape the
//! registration flow publishes and the display flow reads back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    COMPONENT_BACKGROUND_COLOR, COMPONENT_EXTERNAL_URL, COMPONENT_NAME_PREFIX,
    COMPONENT_PLACEHOLDER_IMAGE, MIN_COMPONENT_ID_LEN,
};
use crate::error::{Result, SupplyDnaError};

/// Date format of manufacturing and registration dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// A component as entered in the registration form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Component identifier (also the on-chain lookup key)
    pub id: String,
    /// Human-readable component name
    pub name: String,
    /// Supplier name
    pub supplier: String,
    /// Production batch
    pub batch: String,
    /// Manufacturing date (`YYYY-MM-DD`)
    pub date: String,
}

impl ComponentRecord {
    /// Checks every field is present and well-formed.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("id", &self.id),
            ("name", &self.name),
            ("supplier", &self.supplier),
            ("batch", &self.batch),
            ("date", &self.date),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(SupplyDnaError::ValidationError(format!("{} is required", field)));
            }
        }

        if self.id.trim().chars().count() < MIN_COMPONENT_ID_LEN {
            return Err(SupplyDnaError::ValidationError(format!(
                "id must be at least {} characters",
                MIN_COMPONENT_ID_LEN
            )));
        }

        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).map_err(|e| {
            SupplyDnaError::ValidationError(format!("date '{}' is not YYYY-MM-DD: {}", self.date, e))
        })?;

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NFT METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// One `{trait_type, value}` entry of NFT metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute label
    pub trait_type: String,
    /// Attribute value, usually a string
    pub value: Value,
}

impl Attribute {
    /// Creates a string-valued attribute.
    pub fn new(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: Value::String(value.into()),
        }
    }

    /// Returns the value as display text; strings are shown without quotes.
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// NFT metadata in the conventional marketplace shape.
///
/// Every field defaults when absent so documents written by other tools
/// still render.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftMetadata {
    /// NFT display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Image URL
    pub image: String,
    /// Ordered list of traits
    pub attributes: Vec<Attribute>,
    /// Link to the project site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    /// Background color, hex without `#`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl NftMetadata {
    /// Builds the metadata published when a component is registered.
    pub fn for_component(record: &ComponentRecord, registered_on: NaiveDate) -> Self {
        Self {
            name: format!("{}{}", COMPONENT_NAME_PREFIX, record.id),
            description: format!(
                "Component {} registered in SupplyDNA blockchain traceability system",
                record.id
            ),
            image: COMPONENT_PLACEHOLDER_IMAGE.into(),
            attributes: vec![
                Attribute::new("Component ID", &record.id),
                Attribute::new("Name", &record.name),
                Attribute::new("Supplier", &record.supplier),
                Attribute::new("Batch", &record.batch),
                Attribute::new("Manufacturing Date", &record.date),
                Attribute::new(
                    "Registration Date",
                    registered_on.format(DATE_FORMAT).to_string(),
                ),
            ],
            external_url: Some(COMPONENT_EXTERNAL_URL.into()),
            background_color: Some(COMPONENT_BACKGROUND_COLOR.into()),
        }
    }

    /// Reads metadata out of a retrieved document.
    pub fn from_document(document: &Value) -> Result<Self> {
        Ok(serde_json::from_value(document.clone())?)
    }

    /// Looks up an attribute value by trait type.
    pub fn attribute(&self, trait_type: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(Attribute::display_value)
    }
}
