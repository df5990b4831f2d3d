//! Download hash generation

use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::catalog::OperatorId;

const RANDOM_BYTES: usize = 32;

/// Hex SHA-256 over the owner id, a nanosecond timestamp and 32 random bytes
///
/// The random component alone carries 256 bits, so knowing the owner and the
/// creation time does not make the hash guessable.
pub fn generate(owner: OperatorId) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut random = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut random);

    let mut hasher = Sha256::new();
    hasher.update(owner.0.to_be_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(random);
    hex::encode(hasher.finalize())
}

/// Shape check before a store lookup
pub fn is_well_formed(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_64_hex_chars() {
        let hash = generate(OperatorId(1));
        assert!(is_well_formed(&hash));
    }

    #[test]
    fn test_same_owner_gets_distinct_hashes() {
        let a = generate(OperatorId(1));
        let b = generate(OperatorId(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"z".repeat(64)));
    }
}
