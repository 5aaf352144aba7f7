//! Content fingerprinting for cache keys.
//!
//! A fingerprint identifies a cacheable unit of work. Two files with
//! identical bytes share a fingerprint and therefore share one cached
//! analysis result.

use std::path::Path;

/// BLAKE3 hex digest of raw content.
#[must_use]
pub fn fingerprint(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Fingerprint for a file, falling back to a path-derived digest when the
/// content cannot be read.
#[must_use]
pub fn fingerprint_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => fingerprint(&bytes),
        Err(_) => fingerprint(path.to_string_lossy().as_bytes()),
    }
}
