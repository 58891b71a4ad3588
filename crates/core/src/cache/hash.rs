//! Body digests for integrity checks on stored records.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of a response body.
pub fn compute_body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
