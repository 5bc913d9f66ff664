//! Manifest hashing for change tracking.

use sha2::{Digest, Sha256};

/// Hasher for rendered manifest text.
#[derive(Debug, Default)]
pub struct ManifestHasher;

impl ManifestHasher {
    /// Creates a new manifest hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the SHA-256 hex digest of `text`.
    ///
    /// Trailing newlines are ignored so the digest matches the line diff's
    /// notion of equality.
    #[must_use]
    pub fn hash_text(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.trim_end_matches('\n').as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns a short, human-friendly prefix of a digest.
    #[must_use]
    pub fn short_hash(hash: &str) -> &str {
        &hash[..hash.len().min(12)]
    }
}
