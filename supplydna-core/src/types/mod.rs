//! Domain types for SupplyDNA.
//!
//! - [`ContentId`]: opaque identifier returned by the pinning backend
//! - [`MetadataDocument`]: a publishable JSON document
//! - [`NftMetadata`]: the conventional document shape for registered components

mod component;
mod content;

pub use component::*;
pub use content::*;
