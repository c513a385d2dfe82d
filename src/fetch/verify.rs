//! Content verification against declared hashes
//!
//! Hashes are declared as `<algorithm>-<hex digest>` with `sha512` or
//! `sha256` as the algorithm.

use crate::IgnitionError;
use crate::config::Verification;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Split a hash declaration into its algorithm and digest bytes
pub fn parse_hash(declared: &str) -> Result<(HashAlgorithm, Vec<u8>), IgnitionError> {
    let (algorithm, digest) = declared.split_once('-').ok_or_else(|| {
        IgnitionError::InvalidHash(format!("{:?} is not of the form <type>-<value>", declared))
    })?;

    let algorithm = match algorithm {
        "sha512" => HashAlgorithm::Sha512,
        "sha256" => HashAlgorithm::Sha256,
        other => {
            return Err(IgnitionError::InvalidHash(format!(
                "unsupported hash algorithm {:?}",
                other
            )));
        }
    };

    let digest = hex::decode(digest)
        .map_err(|e| IgnitionError::InvalidHash(format!("digest is not hex: {}", e)))?;
    if digest.len() != algorithm.digest_len() {
        return Err(IgnitionError::InvalidHash(format!(
            "{} digest must be {} bytes, got {}",
            algorithm,
            algorithm.digest_len(),
            digest.len()
        )));
    }

    Ok((algorithm, digest))
}

/// Hex SHA512 of `data`, used for diagnostic logging
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Fail unless `data` matches the declared hash. No hash means no check.
pub fn assert_valid(verification: &Verification, data: &[u8]) -> Result<(), IgnitionError> {
    let Some(declared) = &verification.hash else {
        return Ok(());
    };

    let (algorithm, expected) = parse_hash(declared)?;
    let actual = algorithm.digest(data);
    if actual != expected {
        return Err(IgnitionError::Verification {
            expected: declared.clone(),
            actual: format!("{}-{}", algorithm, hex::encode(actual)),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification(hash: &str) -> Verification {
        Verification {
            hash: Some(hash.to_string()),
        }
    }

    #[test]
    fn test_matching_sha512() {
        let data = b"hello world";
        let hash = format!("sha512-{}", sha512_hex(data));
        assert_valid(&verification(&hash), data).unwrap();
    }

    #[test]
    fn test_matching_sha256() {
        let data = b"hello world";
        let hash = format!("sha256-{}", hex::encode(Sha256::digest(data)));
        assert_valid(&verification(&hash), data).unwrap();
    }

    #[test]
    fn test_mismatch() {
        let hash = format!("sha512-{}", sha512_hex(b"expected"));
        let err = assert_valid(&verification(&hash), b"tampered").unwrap_err();
        match err {
            IgnitionError::Verification { expected, actual } => {
                assert_eq!(expected, hash);
                assert_eq!(actual, format!("sha512-{}", sha512_hex(b"tampered")));
            }
            other => panic!("Expected verification error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_hash_passes() {
        assert_valid(&Verification::default(), b"anything").unwrap();
    }

    #[test]
    fn test_malformed_declarations() {
        assert!(parse_hash("sha512").is_err());
        assert!(parse_hash("md5-d41d8cd98f00b204e9800998ecf8427e").is_err());
        assert!(parse_hash("sha512-zz").is_err());
        // Right algorithm, wrong length
        assert!(parse_hash(&format!("sha256-{}", sha512_hex(b"x"))).is_err());
    }
}
