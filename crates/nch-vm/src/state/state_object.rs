//! Cached account with its pending storage and code

use std::collections::BTreeMap;

use nch_crypto::EMPTY_CODE_HASH;
use nch_primitives::{Address, H256};
use nch_storage::{Account, StateDb, StateReader};

use crate::error::VmResult;

/// An account loaded into the transaction-scoped cache.
///
/// `origin_storage` caches committed slot values; `dirty_storage` holds the
/// writes of the current transaction.
#[derive(Clone, Debug)]
pub(crate) struct StateObject {
    pub address: Address,
    pub account: Account,
    pub code: Option<Vec<u8>>,
    pub dirty_code: bool,
    pub origin_storage: BTreeMap<H256, H256>,
    pub dirty_storage: BTreeMap<H256, H256>,
    pub suicided: bool,
    pub deleted: bool,
    /// Created during this transaction; committed storage is not inherited
    pub created: bool,
}

impl StateObject {
    pub fn new(address: Address, account: Account) -> Self {
        Self {
            address,
            account,
            code: None,
            dirty_code: false,
            origin_storage: BTreeMap::new(),
            dirty_storage: BTreeMap::new(),
            suicided: false,
            deleted: false,
            created: false,
        }
    }

    pub fn new_created(address: Address) -> Self {
        Self {
            created: true,
            ..Self::new(address, Account::new())
        }
    }

    pub fn empty(&self) -> bool {
        self.account.is_empty()
    }

    pub fn get_committed_state(&mut self, db: &StateDb, key: &H256) -> VmResult<H256> {
        if let Some(value) = self.origin_storage.get(key) {
            return Ok(*value);
        }
        let value = if self.created {
            H256::ZERO
        } else {
            db.get_storage(&self.address, key)?
        };
        self.origin_storage.insert(*key, value);
        Ok(value)
    }

    pub fn get_state(&mut self, db: &StateDb, key: &H256) -> VmResult<H256> {
        match self.dirty_storage.get(key) {
            Some(value) => Ok(*value),
            None => self.get_committed_state(db, key),
        }
    }

    pub fn code(&mut self, db: &StateDb) -> VmResult<Vec<u8>> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        let code = if self.account.code_hash == EMPTY_CODE_HASH {
            Vec::new()
        } else {
            db.get_code(&self.account.code_hash)?.unwrap_or_default()
        };
        self.code = Some(code.clone());
        Ok(code)
    }

    pub fn set_code(&mut self, code_hash: H256, code: Vec<u8>) {
        self.account.code_hash = code_hash;
        self.code = Some(code);
        self.dirty_code = true;
    }
}
