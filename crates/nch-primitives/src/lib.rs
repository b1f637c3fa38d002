//! # nch-primitives
//!
//! Primitive types shared by the nch contract VM crates.
//!
//! - [`Address`]: 20-byte account identity
//! - [`H256`]: 32-byte hash, also used as a storage key/value
//! - [`U256`]: the 256-bit machine word (re-exported from `primitive-types`)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;
mod error;

pub use address::{Address, AddressError};
pub use hash::{Hash, HashError, H256};
pub use error::PrimitiveError;

pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

/// Account nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;

/// Parse a word from a decimal literal or a `0x`-prefixed hex literal.
pub fn parse_word(s: &str) -> Result<U256, PrimitiveError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some("") => Ok(U256::zero()),
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| format!("{e:?}")),
        None => U256::from_dec_str(s).map_err(|e| format!("{e:?}")),
    };
    parsed.map_err(|e| PrimitiveError::InvalidWord(format!("{s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_roundtrip_through_hash() {
        let w = U256::from(0xdead_beefu64) << 200;
        let h = H256::from_word(w);
        assert_eq!(h.to_word(), w);
    }

    #[test]
    fn test_parse_word() {
        assert_eq!(parse_word("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_word("0xff").unwrap(), U256::from(255u64));
        assert_eq!(parse_word("0x").unwrap(), U256::zero());
        assert!(parse_word("12ab").is_err());
        assert!(parse_word("0xzz").is_err());
    }

    #[test]
    fn test_address_word_truncates_high_bytes() {
        let w = U256::MAX;
        let addr = Address::from_word(w);
        assert_eq!(addr, Address::from_bytes([0xff; 20]));
        assert_eq!(addr.to_word(), U256::MAX >> 96);
    }
}
