//! Checks that content returned by a gateway matches its CID.
//!
//! Gateways are untrusted mirrors. With verification on, the retriever
//! re-derives the sha2-256 digest of what it received and compares it with
//! the one embedded in the CID.

use cid::Cid;
use sha2::{Digest, Sha256};
use tracing::debug;

use supplydna_core::constants::{CODEC_DAG_PB, CODEC_RAW, MULTIHASH_SHA2_256, UNIXFS_CHUNK_SIZE};

/// Outcome of checking a payload against its CID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The payload hashes to the CID.
    Verified,
    /// The payload does not hash to the CID.
    Mismatch,
    /// The CID can't be checked from the payload alone.
    Unverifiable(String),
}

/// Verifies `bytes` against `cid`.
///
/// Supports sha2-256 CIDs with the `raw` codec, and `dag-pb` CIDs (including
/// every CIDv0) for single-block UnixFS files.
pub fn verify_content(cid: &str, bytes: &[u8]) -> Verification {
    let parsed = match Cid::try_from(cid) {
        Ok(parsed) => parsed,
        Err(e) => return Verification::Unverifiable(format!("unparseable CID: {}", e)),
    };

    let hash = parsed.hash();
    if hash.code() != MULTIHASH_SHA2_256 {
        return Verification::Unverifiable(format!(
            "unsupported multihash 0x{:x}",
            hash.code()
        ));
    }

    let computed = match parsed.codec() {
        CODEC_RAW => Sha256::digest(bytes),
        CODEC_DAG_PB => {
            if bytes.len() > UNIXFS_CHUNK_SIZE {
                return Verification::Unverifiable(format!(
                    "{} bytes spans multiple UnixFS blocks",
                    bytes.len()
                ));
            }
            Sha256::digest(unixfs_file_node(bytes))
        }
        other => {
            return Verification::Unverifiable(format!("unsupported codec 0x{:x}", other));
        }
    };

    if computed.as_slice() == hash.digest() {
        Verification::Verified
    } else {
        debug!(
            cid,
            expected = %hex::encode(hash.digest()),
            actual = %hex::encode(computed),
            "Digest mismatch"
        );
        Verification::Mismatch
    }
}

/// Encodes `data` as a leaf DAG-PB node holding a UnixFS file.
///
/// PBNode { Data: UnixFS { Type: File, Data: data, filesize: len } }, no links.
fn unixfs_file_node(data: &[u8]) -> Vec<u8> {
    let mut unixfs = Vec::with_capacity(data.len() + 24);
    unixfs.extend_from_slice(&[0x08, 0x02]);
    if !data.is_empty() {
        unixfs.push(0x12);
        put_varint(&mut unixfs, data.len() as u64);
        unixfs.extend_from_slice(data);
    }
    unixfs.push(0x18);
    put_varint(&mut unixfs, data.len() as u64);

    let mut node = Vec::with_capacity(unixfs.len() + 8);
    node.push(0x0a);
    put_varint(&mut node, unixfs.len() as u64);
    node.extend_from_slice(&unixfs);
    node
}

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}
