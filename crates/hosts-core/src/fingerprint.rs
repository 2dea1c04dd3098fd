//! One-way fingerprints and secret generation
//!
//! Fingerprints are lowercase hex SHA-256 digests. The master secret is only
//! ever stored in this form.

use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

/// Fingerprint of a string
pub fn string_fingerprint(s: &str) -> String {
    bytes_fingerprint(s.as_bytes())
}

/// Fingerprint of a byte slice
pub fn bytes_fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of a file's content
pub async fn file_fingerprint(path: &Path) -> std::io::Result<String> {
    let content = tokio::fs::read(path).await?;
    Ok(bytes_fingerprint(&content))
}

/// Generate a fresh random secret
pub fn generate_secret() -> String {
    Uuid::new_v4().to_string()
}
