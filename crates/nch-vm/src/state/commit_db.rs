//! Journaled, transaction-scoped world state

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use nch_crypto::keccak256;
use nch_primitives::{Address, H256, U256};
use nch_storage::{StateChanges, StateDb, StateReader};
use nch_types::Log;

use super::journal::{Journal, JournalEntry};
use super::state_object::StateObject;
use crate::error::{VmError, VmResult};

/// World state seen by one transaction.
///
/// Reads fall through to the committed [`StateDb`] and are cached. Every
/// mutation is journaled so that [`CommitStateDB::revert_to_snapshot`] can
/// undo it; nothing reaches the store before [`CommitStateDB::commit`].
pub struct CommitStateDB {
    db: StateDb,
    pub(crate) objects: BTreeMap<Address, StateObject>,
    dirty_objects: BTreeSet<Address>,
    journal: Journal,
    pub(crate) refund: u64,

    tx_hash: H256,
    tx_index: u64,
    block_hash: H256,
    block_number: u64,
    pub(crate) logs: BTreeMap<H256, Vec<Log>>,
    pub(crate) log_size: u64,
    pub(crate) preimages: BTreeMap<H256, Vec<u8>>,
}

impl CommitStateDB {
    /// Create a state view over committed state
    pub fn new(db: StateDb) -> Self {
        Self {
            db,
            objects: BTreeMap::new(),
            dirty_objects: BTreeSet::new(),
            journal: Journal::default(),
            refund: 0,
            tx_hash: H256::ZERO,
            tx_index: 0,
            block_hash: H256::ZERO,
            block_number: 0,
            logs: BTreeMap::new(),
            log_size: 0,
            preimages: BTreeMap::new(),
        }
    }

    /// Committed state underneath
    pub fn db(&self) -> &StateDb {
        &self.db
    }

    /// Set the identifiers stamped on logs emitted from now on
    pub fn prepare(&mut self, tx_hash: H256, tx_index: u64, block_hash: H256, block_number: u64) {
        self.tx_hash = tx_hash;
        self.tx_index = tx_index;
        self.block_hash = block_hash;
        self.block_number = block_number;
    }

    // ==================== Object cache ====================

    /// Load an account into the cache; true if it exists and is not deleted
    fn load(&mut self, address: &Address) -> VmResult<bool> {
        if let Some(obj) = self.objects.get(address) {
            return Ok(!obj.deleted);
        }
        match self.db.get_account(address)? {
            Some(account) => {
                self.objects
                    .insert(*address, StateObject::new(*address, account));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn cached(&mut self, address: &Address) -> VmResult<&mut StateObject> {
        self.objects
            .get_mut(address)
            .ok_or_else(|| VmError::Storage(format!("account {address} not cached")))
    }

    fn object(&mut self, address: &Address) -> VmResult<Option<&mut StateObject>> {
        if self.load(address)? {
            Ok(Some(self.cached(address)?))
        } else {
            Ok(None)
        }
    }

    fn get_or_new(&mut self, address: &Address) -> VmResult<&mut StateObject> {
        if self.load(address)? {
            self.cached(address)
        } else {
            self.create_object(*address)
        }
    }

    fn create_object(&mut self, address: Address) -> VmResult<&mut StateObject> {
        self.load(&address)?;
        let entry = match self.objects.get(&address) {
            Some(prev) => JournalEntry::ResetObject {
                prev: Box::new(prev.clone()),
            },
            None => JournalEntry::CreateObject { address },
        };
        self.journal.append(entry);

        let fresh = StateObject::new_created(address);
        Ok(match self.objects.entry(address) {
            Entry::Occupied(mut slot) => {
                slot.insert(fresh);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(fresh),
        })
    }

    // ==================== Accounts ====================

    /// Account exists, including accounts destroyed earlier in this transaction
    pub fn exist(&mut self, address: &Address) -> VmResult<bool> {
        self.load(address)
    }

    /// Account is absent or has no nonce, balance or code
    pub fn empty(&mut self, address: &Address) -> VmResult<bool> {
        Ok(self.object(address)?.map_or(true, |obj| obj.empty()))
    }

    /// Create a fresh account, keeping the balance of any previous one
    pub fn create_account(&mut self, address: Address) -> VmResult<()> {
        let balance = self.object(&address)?.map(|obj| obj.account.balance);
        let obj = self.create_object(address)?;
        if let Some(balance) = balance {
            obj.account.balance = balance;
        }
        Ok(())
    }

    pub fn get_balance(&mut self, address: &Address) -> VmResult<U256> {
        Ok(self
            .object(address)?
            .map_or_else(U256::zero, |obj| obj.account.balance))
    }

    pub fn set_balance(&mut self, address: &Address, balance: U256) -> VmResult<()> {
        let obj = self.get_or_new(address)?;
        let prev = obj.account.balance;
        obj.account.balance = balance;
        self.journal.append(JournalEntry::BalanceChange {
            address: *address,
            prev,
        });
        Ok(())
    }

    pub fn add_balance(&mut self, address: &Address, amount: U256) -> VmResult<()> {
        let balance = self.get_balance(address)?;
        let (sum, overflow) = balance.overflowing_add(amount);
        if overflow {
            return Err(VmError::Storage(format!("balance overflow for {address}")));
        }
        self.set_balance(address, sum)
    }

    pub fn sub_balance(&mut self, address: &Address, amount: U256) -> VmResult<()> {
        let balance = self.get_balance(address)?;
        if balance < amount {
            return Err(VmError::InsufficientBalance);
        }
        self.set_balance(address, balance - amount)
    }

    pub fn get_nonce(&mut self, address: &Address) -> VmResult<u64> {
        Ok(self.object(address)?.map_or(0, |obj| obj.account.nonce))
    }

    pub fn set_nonce(&mut self, address: &Address, nonce: u64) -> VmResult<()> {
        let obj = self.get_or_new(address)?;
        let prev = obj.account.nonce;
        obj.account.nonce = nonce;
        self.journal.append(JournalEntry::NonceChange {
            address: *address,
            prev,
        });
        Ok(())
    }

    // ==================== Code ====================

    pub fn get_code(&mut self, address: &Address) -> VmResult<Vec<u8>> {
        let db = self.db.clone();
        match self.object(address)? {
            Some(obj) => obj.code(&db),
            None => Ok(Vec::new()),
        }
    }

    /// Code hash, or zero for a missing account
    pub fn get_code_hash(&mut self, address: &Address) -> VmResult<H256> {
        Ok(self
            .object(address)?
            .map_or(H256::ZERO, |obj| obj.account.code_hash))
    }

    pub fn get_code_size(&mut self, address: &Address) -> VmResult<usize> {
        Ok(self.get_code(address)?.len())
    }

    pub fn set_code(&mut self, address: &Address, code: Vec<u8>) -> VmResult<()> {
        let code_hash = keccak256(&code);
        let obj = self.get_or_new(address)?;
        let entry = JournalEntry::CodeChange {
            address: *address,
            prev_code: obj.code.take(),
            prev_hash: obj.account.code_hash,
            prev_dirty: obj.dirty_code,
        };
        obj.set_code(code_hash, code);
        self.journal.append(entry);
        Ok(())
    }

    // ==================== Storage ====================

    /// Current value of a slot, including writes of this transaction
    pub fn get_state(&mut self, address: &Address, key: &H256) -> VmResult<H256> {
        let db = self.db.clone();
        match self.object(address)? {
            Some(obj) => obj.get_state(&db, key),
            None => Ok(H256::ZERO),
        }
    }

    /// Value of a slot at the start of the transaction
    pub fn get_committed_state(&mut self, address: &Address, key: &H256) -> VmResult<H256> {
        let db = self.db.clone();
        match self.object(address)? {
            Some(obj) => obj.get_committed_state(&db, key),
            None => Ok(H256::ZERO),
        }
    }

    pub fn set_state(&mut self, address: &Address, key: H256, value: H256) -> VmResult<()> {
        let db = self.db.clone();
        let obj = self.get_or_new(address)?;
        if obj.get_state(&db, &key)? == value {
            return Ok(());
        }
        let prev = obj.dirty_storage.insert(key, value);
        self.journal.append(JournalEntry::StorageChange {
            address: *address,
            key,
            prev,
        });
        Ok(())
    }

    // ==================== Refunds ====================

    pub fn add_refund(&mut self, gas: u64) {
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        self.refund = self.refund.saturating_add(gas);
    }

    pub fn sub_refund(&mut self, gas: u64) -> VmResult<()> {
        if gas > self.refund {
            return Err(VmError::RefundUnderflow);
        }
        self.journal.append(JournalEntry::RefundChange { prev: self.refund });
        self.refund -= gas;
        Ok(())
    }

    pub fn get_refund(&self) -> u64 {
        self.refund
    }

    // ==================== Logs & preimages ====================

    /// Record a log, stamping it with the prepared transaction and block ids
    pub fn add_log(&mut self, mut log: Log) {
        self.journal.append(JournalEntry::AddLog {
            tx_hash: self.tx_hash,
        });
        log.tx_hash = self.tx_hash;
        log.tx_index = self.tx_index;
        log.block_hash = self.block_hash;
        log.block_number = self.block_number;
        log.index = self.log_size;
        self.logs.entry(self.tx_hash).or_default().push(log);
        self.log_size += 1;
    }

    /// Logs of a transaction: committed ones followed by pending ones
    pub fn get_logs(&self, tx_hash: &H256) -> VmResult<Vec<Log>> {
        let mut logs = self.db.get_logs(tx_hash)?;
        if let Some(pending) = self.logs.get(tx_hash) {
            logs.extend(pending.iter().cloned());
        }
        Ok(logs)
    }

    /// All pending logs in emission order
    pub fn logs(&self) -> Vec<Log> {
        let mut logs: Vec<Log> = self.logs.values().flatten().cloned().collect();
        logs.sort_by_key(|log| log.index);
        logs
    }

    pub fn add_preimage(&mut self, hash: H256, preimage: Vec<u8>) {
        if let Entry::Vacant(slot) = self.preimages.entry(hash) {
            slot.insert(preimage);
            self.journal.append(JournalEntry::AddPreimage { hash });
        }
    }

    pub fn preimages(&self) -> &BTreeMap<H256, Vec<u8>> {
        &self.preimages
    }

    // ==================== Self-destruct ====================

    /// Mark an account destroyed and zero its balance; false if it does not exist
    pub fn suicide(&mut self, address: &Address) -> VmResult<bool> {
        let Some(obj) = self.object(address)? else {
            return Ok(false);
        };
        let entry = JournalEntry::Suicide {
            address: *address,
            prev: obj.suicided,
            prev_balance: obj.account.balance,
        };
        obj.suicided = true;
        obj.account.balance = U256::zero();
        self.journal.append(entry);
        Ok(true)
    }

    pub fn has_suicided(&mut self, address: &Address) -> VmResult<bool> {
        Ok(self.object(address)?.map_or(false, |obj| obj.suicided))
    }

    // ==================== Snapshots ====================

    /// Identifier of the current state for a later revert
    pub fn snapshot(&self) -> usize {
        self.journal.len()
    }

    /// Undo every mutation made after `snapshot` was taken
    pub fn revert_to_snapshot(&mut self, snapshot: usize) -> VmResult<()> {
        if snapshot > self.journal.len() {
            return Err(VmError::InvalidSnapshot(snapshot));
        }
        while self.journal.len() > snapshot {
            match self.journal.pop() {
                Some(entry) => entry.undo(self),
                None => break,
            }
        }
        Ok(())
    }

    // ==================== Commit ====================

    /// Close the transaction: destroyed accounts, and empty touched ones when
    /// `delete_empty` is set, become deleted. The journal is discarded.
    pub fn finalise(&mut self, delete_empty: bool) {
        let dirty: Vec<Address> = self.journal.dirty_addresses().copied().collect();
        for address in dirty {
            let Some(obj) = self.objects.get_mut(&address) else {
                continue;
            };
            if obj.suicided || (delete_empty && obj.empty()) {
                obj.deleted = true;
            }
            self.dirty_objects.insert(address);
        }
        self.journal.clear();
        self.refund = 0;
    }

    /// Finalise and write everything to the store in one batch, then reset
    pub fn commit(&mut self, delete_empty: bool) -> VmResult<()> {
        self.finalise(delete_empty);

        let mut changes = StateChanges::default();
        for address in &self.dirty_objects {
            let Some(obj) = self.objects.get(address) else {
                continue;
            };
            if obj.deleted {
                changes.accounts.push((*address, None));
                changes.wiped_storage.push(*address);
                continue;
            }
            if obj.created {
                changes.wiped_storage.push(*address);
            }
            changes.accounts.push((*address, Some(obj.account)));
            if obj.dirty_code {
                if let Some(code) = &obj.code {
                    changes.code.push((obj.account.code_hash, code.clone()));
                }
            }
            for (key, value) in &obj.dirty_storage {
                changes.storage.push((*address, *key, *value));
            }
        }
        changes.logs = std::mem::take(&mut self.logs).into_iter().collect();
        changes.preimages = std::mem::take(&mut self.preimages).into_iter().collect();

        tracing::debug!(
            accounts = changes.accounts.len(),
            slots = changes.storage.len(),
            logs = changes.logs.len(),
            "commit state"
        );
        self.db.commit(changes)?;

        self.objects.clear();
        self.dirty_objects.clear();
        self.log_size = 0;
        Ok(())
    }

    /// Addresses of every account holding code, committed or pending
    pub fn all_contract_addresses(&mut self) -> VmResult<Vec<Address>> {
        let mut out: BTreeSet<Address> = self.db.contract_addresses()?.into_iter().collect();
        for (address, obj) in &self.objects {
            if obj.deleted || obj.suicided {
                out.remove(address);
            } else if obj.account.has_code() {
                out.insert(*address);
            }
        }
        Ok(out.into_iter().collect())
    }
}
