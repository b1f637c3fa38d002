//! Undo log of state mutations

use std::collections::HashMap;

use nch_primitives::{Address, H256, U256};

use super::commit_db::CommitStateDB;
use super::state_object::StateObject;

/// One reversible mutation, carrying the value it replaced
#[derive(Clone, Debug)]
pub(crate) enum JournalEntry {
    CreateObject {
        address: Address,
    },
    ResetObject {
        prev: Box<StateObject>,
    },
    Suicide {
        address: Address,
        prev: bool,
        prev_balance: U256,
    },
    BalanceChange {
        address: Address,
        prev: U256,
    },
    NonceChange {
        address: Address,
        prev: u64,
    },
    StorageChange {
        address: Address,
        key: H256,
        /// Pending value before the write, `None` if the slot was clean
        prev: Option<H256>,
    },
    CodeChange {
        address: Address,
        prev_code: Option<Vec<u8>>,
        prev_hash: H256,
        prev_dirty: bool,
    },
    RefundChange {
        prev: u64,
    },
    AddLog {
        tx_hash: H256,
    },
    AddPreimage {
        hash: H256,
    },
}

impl JournalEntry {
    /// Account the entry touches
    fn address(&self) -> Option<Address> {
        match self {
            JournalEntry::CreateObject { address }
            | JournalEntry::Suicide { address, .. }
            | JournalEntry::BalanceChange { address, .. }
            | JournalEntry::NonceChange { address, .. }
            | JournalEntry::StorageChange { address, .. }
            | JournalEntry::CodeChange { address, .. } => Some(*address),
            JournalEntry::ResetObject { prev } => Some(prev.address),
            JournalEntry::RefundChange { .. }
            | JournalEntry::AddLog { .. }
            | JournalEntry::AddPreimage { .. } => None,
        }
    }

    /// Restore the value this entry replaced
    pub(crate) fn undo(self, db: &mut CommitStateDB) {
        match self {
            JournalEntry::CreateObject { address } => {
                db.objects.remove(&address);
            }
            JournalEntry::ResetObject { prev } => {
                db.objects.insert(prev.address, *prev);
            }
            JournalEntry::Suicide {
                address,
                prev,
                prev_balance,
            } => {
                if let Some(obj) = db.objects.get_mut(&address) {
                    obj.suicided = prev;
                    obj.account.balance = prev_balance;
                }
            }
            JournalEntry::BalanceChange { address, prev } => {
                if let Some(obj) = db.objects.get_mut(&address) {
                    obj.account.balance = prev;
                }
            }
            JournalEntry::NonceChange { address, prev } => {
                if let Some(obj) = db.objects.get_mut(&address) {
                    obj.account.nonce = prev;
                }
            }
            JournalEntry::StorageChange { address, key, prev } => {
                if let Some(obj) = db.objects.get_mut(&address) {
                    match prev {
                        Some(value) => obj.dirty_storage.insert(key, value),
                        None => obj.dirty_storage.remove(&key),
                    };
                }
            }
            JournalEntry::CodeChange {
                address,
                prev_code,
                prev_hash,
                prev_dirty,
            } => {
                if let Some(obj) = db.objects.get_mut(&address) {
                    obj.code = prev_code;
                    obj.account.code_hash = prev_hash;
                    obj.dirty_code = prev_dirty;
                }
            }
            JournalEntry::RefundChange { prev } => db.refund = prev,
            JournalEntry::AddLog { tx_hash } => {
                if let Some(logs) = db.logs.get_mut(&tx_hash) {
                    logs.pop();
                    if logs.is_empty() {
                        db.logs.remove(&tx_hash);
                    }
                }
                db.log_size -= 1;
            }
            JournalEntry::AddPreimage { hash } => {
                db.preimages.remove(&hash);
            }
        }
    }
}

/// Ordered list of journal entries plus a count of entries per account
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    dirties: HashMap<Address, usize>,
}

impl Journal {
    pub fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.address() {
            *self.dirties.entry(address).or_default() += 1;
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return the newest entry
    pub fn pop(&mut self) -> Option<JournalEntry> {
        let entry = self.entries.pop()?;
        if let Some(address) = entry.address() {
            if let Some(count) = self.dirties.get_mut(&address) {
                *count -= 1;
                if *count == 0 {
                    self.dirties.remove(&address);
                }
            }
        }
        Some(entry)
    }

    /// Accounts with at least one live entry
    pub fn dirty_addresses(&self) -> impl Iterator<Item = &Address> {
        self.dirties.keys()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dirties.clear();
    }
}
