//! Keccak-256 hashing

use nch_primitives::H256;
use sha3::{Digest, Keccak256};

/// keccak256 of the empty byte string: the code hash of accounts without code.
pub const EMPTY_CODE_HASH: H256 = H256::from_bytes([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Compute Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_bytes(hasher.finalize().into())
}

/// Keccak-256 over the concatenation of `parts`, without allocating the joined buffer.
pub fn keccak256_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    H256::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(keccak256(&[]), EMPTY_CODE_HASH);
        assert_eq!(
            EMPTY_CODE_HASH.to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak256_hello() {
        let hash = keccak256(b"hello");
        assert_eq!(
            hash.to_hex(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_keccak256_32_zero_bytes() {
        let hash = keccak256(&[0u8; 32]);
        assert_eq!(
            hex::encode(hash.as_bytes()),
            "290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
    }

    #[test]
    fn test_keccak256_concat_matches_joined_input() {
        let joined = keccak256(b"hello world");
        let parts = keccak256_concat(&[&b"hello"[..], &b" "[..], &b"world"[..]]);
        assert_eq!(joined, parts);
        assert_eq!(keccak256_concat(&[]), EMPTY_CODE_HASH);
    }
}
