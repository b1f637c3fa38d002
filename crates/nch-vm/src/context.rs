//! Block and transaction context visible to contracts

use std::collections::BTreeMap;

use nch_primitives::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Number of recent block hashes BLOCKHASH can see
pub const BLOCK_HASH_WINDOW: u64 = 256;

/// Block environment
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockContext {
    /// Block height
    pub number: u64,
    /// Block time in seconds
    pub timestamp: u64,
    /// Chain id returned by CHAINID
    pub chain_id: U256,
    /// Block proposer
    pub coinbase: Address,
    /// Block gas limit
    pub gas_limit: u64,
    /// Difficulty, always zero on this chain unless configured
    pub difficulty: U256,
    /// Hash of the current block, stamped on logs
    pub hash: H256,
    /// Hashes of previous blocks by height
    pub recent_hashes: BTreeMap<u64, H256>,
}

impl BlockContext {
    /// Hash of block `number` if it is one of the 256 blocks before this one
    pub fn block_hash(&self, number: u64) -> H256 {
        let lower = self.number.saturating_sub(BLOCK_HASH_WINDOW);
        if number >= lower && number < self.number {
            self.recent_hashes.get(&number).copied().unwrap_or(H256::ZERO)
        } else {
            H256::ZERO
        }
    }
}

/// Transaction environment
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxContext {
    /// Transaction sender
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
    /// Transaction hash, used to key logs
    pub tx_hash: H256,
    /// Position of the transaction in its block
    pub tx_index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_window() {
        let mut block = BlockContext {
            number: 300,
            ..Default::default()
        };
        block.recent_hashes.insert(299, H256::from_bytes([1; 32]));
        block.recent_hashes.insert(44, H256::from_bytes([2; 32]));
        block.recent_hashes.insert(43, H256::from_bytes([3; 32]));

        assert_eq!(block.block_hash(299), H256::from_bytes([1; 32]));
        assert_eq!(block.block_hash(44), H256::from_bytes([2; 32]));
        assert_eq!(block.block_hash(43), H256::ZERO);
        assert_eq!(block.block_hash(300), H256::ZERO);
        assert_eq!(block.block_hash(250), H256::ZERO);
    }
}
