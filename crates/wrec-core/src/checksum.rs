//! Content digests for captured payloads.
//!
//! Digests use the `sha256:<hex>` form common to web archive indexes so that
//! records imported from HAR files sort and display alongside archive records.

use sha2::{Digest, Sha256};

/// Digest of `payload` as `sha256:` followed by lowercase hex.
pub fn payload_digest(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    format!("sha256:{}", hex::encode(digest))
}
