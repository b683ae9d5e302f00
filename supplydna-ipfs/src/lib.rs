//! IPFS storage for SupplyDNA component metadata.
//!
//! - [`Publisher`] posts a document to the upload proxy and returns its CID.
//! - [`Retriever`] reads a document back through an ordered list of public
//!   gateways, first success wins.
//! - [`PinataClient`] is the proxy's upstream: it pins JSON with Pinata
//!   credentials that never leave the server.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod integrity;
mod pinata;
mod publisher;
mod retriever;

pub use config::StorageConfig;
pub use integrity::{verify_content, Verification};
pub use pinata::{PinataClient, PinataConfig, PinResponse};
pub use publisher::Publisher;
pub use retriever::{RetrievalState, Retriever};

pub use tokio_util::sync::CancellationToken;
