//! Typed state access over a [`KvStore`]

use std::sync::Arc;

use nch_primitives::{Address, H256};
use nch_types::Log;

use crate::account::{Account, StateReader};
use crate::error::{StorageError, StorageResult};
use crate::keys;
use crate::kv::{Column, KvStore, WriteBatch};

/// Everything one committed transaction writes to the store
#[derive(Clone, Debug, Default)]
pub struct StateChanges {
    /// Updated account records; `None` deletes the account
    pub accounts: Vec<(Address, Option<Account>)>,
    /// Accounts whose whole storage is cleared before `storage` is applied
    pub wiped_storage: Vec<Address>,
    /// Slot writes; zero values delete the slot
    pub storage: Vec<(Address, H256, H256)>,
    /// New code blobs by hash
    pub code: Vec<(H256, Vec<u8>)>,
    /// Logs per transaction hash, appended to any already stored under it
    pub logs: Vec<(H256, Vec<Log>)>,
    /// Hash preimages
    pub preimages: Vec<(H256, Vec<u8>)>,
}

impl StateChanges {
    /// True when nothing would be written
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.wiped_storage.is_empty()
            && self.storage.is_empty()
            && self.code.is_empty()
            && self.logs.is_empty()
            && self.preimages.is_empty()
    }
}

/// Committed state database
#[derive(Clone)]
pub struct StateDb {
    kv: Arc<dyn KvStore>,
}

impl StateDb {
    /// Create a state database over a store
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Preimage of a hash recorded by a committed transaction
    pub fn get_preimage(&self, hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.kv.get(Column::Preimages, hash.as_bytes())
    }

    /// Every non-zero storage slot of an account, in slot order
    pub fn storage_entries(&self, address: &Address) -> StorageResult<Vec<(H256, H256)>> {
        self.kv
            .iter_prefix(Column::Storage, &keys::storage_prefix(address))?
            .into_iter()
            .map(|(key, value)| {
                let (_, slot) = keys::split_storage_key(&key)
                    .ok_or_else(|| StorageError::InvalidFormat("storage key".into()))?;
                let value = H256::from_slice(&value)
                    .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
                Ok((slot, value))
            })
            .collect()
    }

    /// Write a set of changes atomically
    pub fn commit(&self, changes: StateChanges) -> StorageResult<()> {
        let mut batch = WriteBatch::new();

        for address in &changes.wiped_storage {
            batch.delete_prefix(Column::Storage, &keys::storage_prefix(address));
        }

        for (address, account) in &changes.accounts {
            match account {
                Some(account) => {
                    batch.put(Column::Accounts, &keys::account_key(address), &account.to_bytes())
                }
                None => batch.delete(Column::Accounts, &keys::account_key(address)),
            }
        }

        for (address, slot, value) in &changes.storage {
            let key = keys::storage_key(address, slot);
            if value.is_zero() {
                batch.delete(Column::Storage, &key);
            } else {
                batch.put(Column::Storage, &key, value.as_bytes());
            }
        }

        for (code_hash, code) in &changes.code {
            batch.put(Column::Code, code_hash.as_bytes(), code);
        }

        for (tx_hash, logs) in &changes.logs {
            let mut stored = self.get_logs(tx_hash)?;
            stored.extend(logs.iter().cloned());
            batch.put(Column::Logs, tx_hash.as_bytes(), &serde_json::to_vec(&stored)?);
        }

        for (hash, preimage) in &changes.preimages {
            batch.put(Column::Preimages, hash.as_bytes(), preimage);
        }

        tracing::debug!(operations = batch.len(), "committing state changes");
        self.kv.write(batch)
    }
}

impl StateReader for StateDb {
    fn get_account(&self, address: &Address) -> StorageResult<Option<Account>> {
        self.kv
            .get(Column::Accounts, &keys::account_key(address))?
            .map(|bytes| Account::from_bytes(&bytes))
            .transpose()
    }

    fn get_storage(&self, address: &Address, key: &H256) -> StorageResult<H256> {
        match self.kv.get(Column::Storage, &keys::storage_key(address, key))? {
            Some(bytes) => {
                H256::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat(e.to_string()))
            }
            None => Ok(H256::ZERO),
        }
    }

    fn get_code(&self, code_hash: &H256) -> StorageResult<Option<Vec<u8>>> {
        self.kv.get(Column::Code, code_hash.as_bytes())
    }

    fn get_logs(&self, tx_hash: &H256) -> StorageResult<Vec<Log>> {
        match self.kv.get(Column::Logs, tx_hash.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn contract_addresses(&self) -> StorageResult<Vec<Address>> {
        let mut out = Vec::new();
        for (key, value) in self.kv.iter_prefix(Column::Accounts, &[])? {
            if Account::from_bytes(&value)?.has_code() {
                let address = Address::from_slice(&key)
                    .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
                out.push(address);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::memory::MemoryDb;
    use bytes::Bytes;
    use nch_primitives::U256;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn slot(n: u64) -> H256 {
        H256::from_word(U256::from(n))
    }

    fn memory_state() -> StateDb {
        StateDb::new(Arc::new(MemoryDb::new()))
    }

    #[test]
    fn test_absent_values_read_as_defaults() {
        let state = memory_state();
        assert_eq!(state.get_account(&addr(1)).unwrap(), None);
        assert_eq!(state.get_storage(&addr(1), &slot(0)).unwrap(), H256::ZERO);
        assert!(state.get_logs(&H256::ZERO).unwrap().is_empty());
        assert!(state.contract_addresses().unwrap().is_empty());
    }

    #[test]
    fn test_commit_and_read_back() {
        let state = memory_state();
        let code = vec![0x60, 0x00];
        let code_hash = nch_crypto::keccak256(&code);
        let tx = H256::from_bytes([9; 32]);
        let log = Log::new(addr(2), vec![slot(1)], Bytes::from_static(b"hi"));

        state
            .commit(StateChanges {
                accounts: vec![
                    (addr(1), Some(Account { nonce: 1, balance: U256::from(5u64), ..Account::new() })),
                    (addr(2), Some(Account { code_hash, ..Account::new() })),
                ],
                storage: vec![(addr(2), slot(7), slot(42))],
                code: vec![(code_hash, code.clone())],
                logs: vec![(tx, vec![log.clone()])],
                preimages: vec![(code_hash, code.clone())],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(state.get_account(&addr(1)).unwrap().unwrap().nonce, 1);
        assert_eq!(state.get_storage(&addr(2), &slot(7)).unwrap(), slot(42));
        assert_eq!(state.get_code(&code_hash).unwrap(), Some(code.clone()));
        assert_eq!(state.get_logs(&tx).unwrap(), vec![log]);
        assert_eq!(state.get_preimage(&code_hash).unwrap(), Some(code));
        assert_eq!(state.contract_addresses().unwrap(), vec![addr(2)]);
    }

    #[test]
    fn test_logs_under_a_shared_tx_hash_accumulate() {
        let state = memory_state();
        let tx = H256::ZERO;
        let first = Log::new(addr(1), vec![], Bytes::from_static(b"a"));
        let second = Log::new(addr(2), vec![slot(3)], Bytes::from_static(b"b"));

        for log in [&first, &second] {
            state
                .commit(StateChanges {
                    logs: vec![(tx, vec![log.clone()])],
                    ..Default::default()
                })
                .unwrap();
        }

        assert_eq!(state.get_logs(&tx).unwrap(), vec![first, second]);
    }

    #[test]
    fn test_zero_write_deletes_slot_and_wipe_clears_account_storage() {
        let state = memory_state();
        state
            .commit(StateChanges {
                storage: vec![
                    (addr(1), slot(1), slot(1)),
                    (addr(1), slot(2), slot(2)),
                    (addr(3), slot(1), slot(3)),
                ],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(state.storage_entries(&addr(1)).unwrap().len(), 2);

        state
            .commit(StateChanges {
                storage: vec![(addr(1), slot(1), H256::ZERO)],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(state.storage_entries(&addr(1)).unwrap(), vec![(slot(2), slot(2))]);

        state
            .commit(StateChanges {
                accounts: vec![(addr(1), None)],
                wiped_storage: vec![addr(1)],
                ..Default::default()
            })
            .unwrap();
        assert!(state.storage_entries(&addr(1)).unwrap().is_empty());
        assert_eq!(state.get_storage(&addr(3), &slot(1)).unwrap(), slot(3));
    }

    #[test]
    fn test_rocksdb_backed_state_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let db = Database::open_at(dir.path()).unwrap();
            let state = StateDb::new(Arc::new(db));
            state
                .commit(StateChanges {
                    storage: vec![(addr(4), slot(1), slot(99))],
                    ..Default::default()
                })
                .unwrap();
        }
        let db = Database::open_at(dir.path()).unwrap();
        let state = StateDb::new(Arc::new(db));
        assert_eq!(state.get_storage(&addr(4), &slot(1)).unwrap(), slot(99));
    }
}
