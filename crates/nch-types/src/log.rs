//! Contract event logs

use bytes::Bytes;
use nch_primitives::{Address, H256};
use serde::{Deserialize, Serialize};

/// Event emitted by a LOG0..LOG4 instruction.
///
/// `address`, `topics` and `data` come from the emitting frame. The remaining
/// fields are filled in by the state database when the log is recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract that emitted the log
    pub address: Address,
    /// Indexed topics, at most four
    pub topics: Vec<H256>,
    /// Non-indexed payload
    #[serde(with = "crate::serde_hex")]
    pub data: Bytes,
    /// Height of the block containing the transaction
    #[serde(rename = "blockNumber")]
    pub block_number: u64,
    /// Hash of the emitting transaction
    #[serde(rename = "transactionHash")]
    pub tx_hash: H256,
    /// Index of the transaction in its block
    #[serde(rename = "transactionIndex")]
    pub tx_index: u64,
    /// Hash of the block containing the transaction
    #[serde(rename = "blockHash")]
    pub block_hash: H256,
    /// Position of the log among all logs of the block
    #[serde(rename = "logIndex")]
    pub index: u64,
    /// Set when the log was dropped by a chain reorganisation
    pub removed: bool,
}

impl Log {
    /// Create a log with empty transaction metadata
    pub fn new(address: Address, topics: Vec<H256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
            ..Default::default()
        }
    }

    /// Get the first topic (usually the event signature)
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }
}
