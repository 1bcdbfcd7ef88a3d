// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document integrity — SHA-256 hashing of inputs and committed outputs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use typekeep_core::error::TypekeepError;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Stream a file through SHA-256 in 4 KiB blocks.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String, TypekeepError> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut block = [0u8; 4096];
    loop {
        let read = reader.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verify that `data` matches the expected SHA-256 hex digest.
///
/// Returns `Err(TypekeepError::Audit)` naming both digests on mismatch.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), TypekeepError> {
    let actual = hash_bytes(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(TypekeepError::Audit(format!(
            "integrity check failed: expected {expected_hex}, got {actual}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello"), checked with coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn file_hash_matches_byte_hash_across_blocks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = hash_file("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, TypekeepError::Io(_)));
    }

    #[test]
    fn verify_mismatched_hash() {
        assert!(verify_hash(b"a", &hash_bytes(b"a")).is_ok());
        let err = verify_hash(b"a", "0000").unwrap_err();
        assert!(err.to_string().contains("expected 0000"));
    }
}
