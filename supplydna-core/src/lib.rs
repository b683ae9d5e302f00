//! # SupplyDNA Core
//!
//! Core types, errors, and traits for SupplyDNA's content-addressed metadata layer.
//!
//! This crate provides the building blocks shared by the other SupplyDNA crates:
//!
//! - **Types**: content identifiers, publishable documents, component NFT metadata
//! - **Errors**: the storage error taxonomy
//! - **Constants**: default gateways, timeouts, and metadata conventions
//! - **Traits**: publisher/retriever interfaces
//!
//! ## Example
//!
//! ```rust
//! use supplydna_core::{ContentId, MetadataDocument};
//!
//! let doc = MetadataDocument::new(serde_json::json!({ "name": "bolt" })).unwrap();
//! let cid = ContentId::parse("ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").unwrap();
//! assert_eq!(cid.as_str(), "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
//! assert!(!doc.as_value().is_null());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, SupplyDnaError};
pub use traits::*;
pub use types::*;
