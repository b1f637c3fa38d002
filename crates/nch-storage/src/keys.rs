//! Key construction.
//!
//! Keys are fixed width so that no two (address, slot) pairs can collide and
//! a byte-ordered store iterates them grouped by address, then by slot.

use nch_primitives::{Address, H256};

/// Length of a storage slot key
pub const STORAGE_KEY_LEN: usize = Address::LEN + H256::LEN;

/// Key of an account record
pub fn account_key(address: &Address) -> [u8; Address::LEN] {
    *address.as_bytes()
}

/// Key of one storage slot: `address ‖ slot`
pub fn storage_key(address: &Address, slot: &H256) -> [u8; STORAGE_KEY_LEN] {
    let mut key = [0u8; STORAGE_KEY_LEN];
    key[..Address::LEN].copy_from_slice(address.as_bytes());
    key[Address::LEN..].copy_from_slice(slot.as_bytes());
    key
}

/// Prefix shared by every storage slot of `address`
pub fn storage_prefix(address: &Address) -> [u8; Address::LEN] {
    *address.as_bytes()
}

/// Split a storage key back into its address and slot
pub fn split_storage_key(key: &[u8]) -> Option<(Address, H256)> {
    if key.len() != STORAGE_KEY_LEN {
        return None;
    }
    let address = Address::from_slice(&key[..Address::LEN]).ok()?;
    let slot = H256::from_slice(&key[Address::LEN..]).ok()?;
    Some((address, slot))
}
