//! Contract address derivation

use nch_crypto::{keccak256, keccak256_concat};
use nch_primitives::{Address, H256};
use rlp::RlpStream;

/// Address of a contract created by `sender` at `nonce`:
/// the last 20 bytes of `keccak256(rlp([sender, nonce]))`
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    let hash = keccak256(&stream.out());
    Address::from_word(hash.to_word())
}

/// Address of a contract created with CREATE2:
/// the last 20 bytes of `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))`
pub fn create2_address(sender: &Address, salt: &H256, init_code: &[u8]) -> Address {
    let code_hash = keccak256(init_code);
    let hash = keccak256_concat(&[
        &[0xffu8][..],
        &sender.as_bytes()[..],
        &salt.as_bytes()[..],
        &code_hash.as_bytes()[..],
    ]);
    Address::from_word(hash.to_word())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_addr(s: &str) -> Address {
        Address::from_hex(s).unwrap()
    }

    #[test]
    fn test_create_address_known_vector() {
        let sender = hex_addr("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            create_address(&sender, 0),
            hex_addr("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            create_address(&sender, 1),
            hex_addr("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[test]
    fn test_create2_address_known_vector() {
        // zero sender, zero salt, init code 0x00
        let address = create2_address(&Address::ZERO, &H256::ZERO, &[0x00]);
        assert_eq!(address, hex_addr("0x4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"));
    }

    #[test]
    fn test_create2_depends_on_salt_and_code() {
        let sender = hex_addr("0xdeadbeef00000000000000000000000000000000");
        let a = create2_address(&sender, &H256::ZERO, &[0x00]);
        let b = create2_address(&sender, &H256::from_bytes([1; 32]), &[0x00]);
        let c = create2_address(&sender, &H256::ZERO, &[0x01]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, create2_address(&sender, &H256::ZERO, &[0x00]));
    }
}
