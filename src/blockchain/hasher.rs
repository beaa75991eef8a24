use serde::Serialize;
use sha2::{Digest, Sha256};

use super::block::Block;

/// Serializes a value into its canonical JSON form
///
/// The value is routed through `serde_json::Value`, whose object map keeps
/// keys sorted, so the output does not depend on field declaration order.
///
/// # Errors
///
/// Fails for values JSON cannot represent, such as maps with non-string keys
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let canonical = serde_json::to_value(value)?;
    Ok(canonical.to_string().into_bytes())
}

/// Hashes raw bytes with SHA-256
///
/// # Returns
///
/// The digest as a 64 character lowercase hexadecimal string
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hashes a block over its canonical serialization
pub fn digest(block: &Block) -> String {
    // Blocks hold only strings, numbers and sequences, which always convert
    let bytes = canonical_bytes(block).expect("block serializes to a JSON value");
    digest_bytes(&bytes)
}
