//! SHA-256 checksum utilities for upload integrity tracking
//!
//! Every stored upload carries the hex-encoded SHA-256 digest of the exact
//! bytes written to the blob store. Submission-time duplicate detection
//! compares these digests.

use crate::error::{CatalogError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the hex-encoded SHA-256 digest of a byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the hex-encoded SHA-256 digest of any readable source, streaming
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the checksum of a file on disk
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// Verify that a file matches an expected digest
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let actual = compute_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(true)
    } else {
        Err(CatalogError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
