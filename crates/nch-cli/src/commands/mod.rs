//! Subcommand implementations

pub mod query;
pub mod tx;

use nch_primitives::{parse_word, Address, H256, U256};

use crate::CliError;

pub(crate) fn parse_address(s: &str) -> Result<Address, CliError> {
    Address::from_hex(s).map_err(|e| CliError::InvalidAddress(e.to_string()))
}

pub(crate) fn parse_amount(s: &str) -> Result<U256, CliError> {
    parse_word(s).map_err(|e| CliError::InvalidAmount(e.to_string()))
}

pub(crate) fn parse_hex(s: &str) -> Result<Vec<u8>, CliError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| CliError::InvalidHex(e.to_string()))
}

pub(crate) fn parse_h256(s: &str) -> Result<H256, CliError> {
    H256::from_hex(s).map_err(|e| CliError::InvalidHex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_amount("0x10").unwrap(), U256::from(16u64));
        assert_eq!(parse_hex("0x6000").unwrap(), vec![0x60, 0x00]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(matches!(parse_hex("0xz"), Err(CliError::InvalidHex(_))));
        assert!(matches!(parse_address("0x1234"), Err(CliError::InvalidAddress(_))));
        assert_eq!(
            parse_address("0x0101010101010101010101010101010101010101").unwrap(),
            Address::from_bytes([1; 20])
        );
    }
}
