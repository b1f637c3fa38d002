//! Account records and read access to committed state

use crate::error::{StorageError, StorageResult};
use nch_crypto::EMPTY_CODE_HASH;
use nch_primitives::{Address, H256, U256};
use nch_types::Log;

/// Account record as persisted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// keccak256 of the account's code, [`EMPTY_CODE_HASH`] when it has none
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    const ENCODED_LEN: usize = 8 + 32 + 32;

    /// Create a new empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// No nonce, no balance, no code
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }

    /// Fixed-width encoding: nonce (LE) ‖ balance (BE) ‖ code hash
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        let mut balance = [0u8; 32];
        self.balance.to_big_endian(&mut balance);
        bytes.extend_from_slice(&balance);
        bytes.extend_from_slice(self.code_hash.as_bytes());
        bytes
    }

    /// Decode an account record
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(StorageError::InvalidFormat(format!(
                "account record of {} bytes",
                bytes.len()
            )));
        }
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&bytes[0..8]);
        let code_hash = H256::from_slice(&bytes[40..72])
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        Ok(Self {
            nonce: u64::from_le_bytes(nonce),
            balance: U256::from_big_endian(&bytes[8..40]),
            code_hash,
        })
    }
}

/// Read access to committed state
pub trait StateReader: Send + Sync {
    /// Get account by address
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>>;

    /// Get storage value; absent slots read as zero
    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256>;

    /// Get contract code by hash
    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>>;

    /// All logs recorded for a transaction
    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Vec<Log>>;

    /// Every address whose account currently holds code
    fn contract_addresses(&self) -> StorageResult<Vec<Address>>;

    /// Check if account exists
    fn account_exists(&self, address: &Address) -> StorageResult<bool> {
        Ok(self.get_account(address)?.is_some())
    }
}
