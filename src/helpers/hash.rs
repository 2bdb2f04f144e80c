//! SHA-256 helpers

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of a string.
///
/// Used both as the change fingerprint of a post source and as the
/// credential value for protected posts.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
