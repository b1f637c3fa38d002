//! In-memory key-value store

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::StorageResult;
use crate::kv::{BatchOp, Column, KvStore, WriteBatch};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory store. Batches are applied under one write lock.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<HashMap<Column, Table>>,
}

impl MemoryDb {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in a column
    pub fn len(&self, column: Column) -> usize {
        self.tables.read().get(&column).map_or(0, BTreeMap::len)
    }
}

impl KvStore for MemoryDb {
    fn get(&self, column: Column, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .tables
            .read()
            .get(&column)
            .and_then(|table| table.get(key).cloned()))
    }

    fn iter_prefix(&self, column: Column, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self.tables.read();
        let Some(table) = tables.get(&column) else {
            return Ok(Vec::new());
        };
        Ok(table
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut tables = self.tables.write();
        for op in batch.operations {
            match op {
                BatchOp::Put { column, key, value } => {
                    tables.entry(column).or_default().insert(key, value);
                }
                BatchOp::Delete { column, key } => {
                    if let Some(table) = tables.get_mut(&column) {
                        table.remove(&key);
                    }
                }
                BatchOp::DeletePrefix { column, prefix } => {
                    if let Some(table) = tables.get_mut(&column) {
                        table.retain(|k, _| !k.starts_with(&prefix));
                    }
                }
            }
        }
        Ok(())
    }
}
