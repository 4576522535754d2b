//! Opaque identifier generation
//!
//! Every row id in the platform is the URL-safe base64 encoding of 16
//! random bytes: 22 characters, no padding.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of a generated identifier in characters
pub const ID_LEN: usize = 22;

/// Generate a new opaque identifier
pub fn new_id() -> String {
    // Uuid v4 carries exactly the 16 random bytes we need
    general_purpose::URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// SHA-256 of arbitrary content as lowercase hex
///
/// Used for connector content hashes and refresh-token fingerprints.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
