//! Partition key derivation from query names.
//!
//! A query name is reduced to its first label (`apple` for `apple.example.com`)
//! and the label is mapped to a single character that indexes the partition table:
//!
//! - `FirstLetter` uses the first character of the label.
//! - `HashPrefix` uses the first hex digit of the label's SHA-256 digest, which
//!   spreads names uniformly over 16 buckets (`0`-`9`, `a`-`f`).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BackendError;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// How a partition key is derived from a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFunction {
    /// First character of the label.
    #[serde(alias = "name")]
    FirstLetter,
    /// First lowercase hex character of SHA-256 over the label bytes.
    #[serde(alias = "hash")]
    HashPrefix,
}

/// Return the first DNS label of `qname` (everything before the first `.`).
pub fn first_label(qname: &str) -> &str {
    qname.split('.').next().unwrap_or_default()
}

/// Derive the partition key for `label`.
pub fn derive_key(label: &str, function: KeyFunction) -> Result<char, BackendError> {
    let first = label.chars().next().ok_or_else(|| {
        BackendError::InvalidInput("cannot derive a partition key from an empty label".into())
    })?;

    match function {
        KeyFunction::FirstLetter => Ok(first),
        KeyFunction::HashPrefix => {
            let digest = Sha256::digest(label.as_bytes());
            Ok(HEX_DIGITS[usize::from(digest[0] >> 4)] as char)
        }
    }
}

/// Stable 64-bit hash of a label, used to spread names over multiple targets.
pub fn label_hash(label: &str) -> u64 {
    let digest = Sha256::digest(label.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
