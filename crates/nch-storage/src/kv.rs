//! Key-value store abstraction

use crate::error::StorageResult;

/// Column families (namespaces) of the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    /// address → account record
    Accounts,
    /// address ‖ slot → value
    Storage,
    /// code hash → code
    Code,
    /// tx hash → JSON list of logs
    Logs,
    /// hash → preimage
    Preimages,
}

impl Column {
    /// Every column, in a fixed order
    pub const ALL: [Column; 5] = [
        Column::Accounts,
        Column::Storage,
        Column::Code,
        Column::Logs,
        Column::Preimages,
    ];

    /// Column family name
    pub fn name(self) -> &'static str {
        match self {
            Column::Accounts => "accounts",
            Column::Storage => "storage",
            Column::Code => "code",
            Column::Logs => "logs",
            Column::Preimages => "preimages",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BatchOp {
    Put { column: Column, key: Vec<u8>, value: Vec<u8> },
    Delete { column: Column, key: Vec<u8> },
    DeletePrefix { column: Column, prefix: Vec<u8> },
}

/// Set of writes applied atomically by [`KvStore::write`]
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    pub(crate) operations: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a put operation
    pub fn put(&mut self, column: Column, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put {
            column,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, column: Column, key: &[u8]) {
        self.operations.push(BatchOp::Delete {
            column,
            key: key.to_vec(),
        });
    }

    /// Delete every key of `column` that starts with `prefix`.
    ///
    /// Applied in order with the other operations: puts recorded after it survive.
    pub fn delete_prefix(&mut self, column: Column, prefix: &[u8]) {
        self.operations.push(BatchOp::DeletePrefix {
            column,
            prefix: prefix.to_vec(),
        });
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Column-oriented key-value store
pub trait KvStore: Send + Sync {
    /// Read one value
    fn get(&self, column: Column, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// All entries of `column` whose key starts with `prefix`, in key order
    fn iter_prefix(&self, column: Column, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply a batch atomically
    fn write(&self, batch: WriteBatch) -> StorageResult<()>;
}
