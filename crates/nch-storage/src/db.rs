//! RocksDB backend

use crate::error::{StorageError, StorageResult};
use crate::kv::{BatchOp, Column, KvStore, WriteBatch};
use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};
use std::path::Path;
use std::sync::Arc;

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// RocksDB store with one column family per [`Column`]
pub struct Database {
    db: Arc<RwLock<Option<RocksDB>>>,
    path: String,
}

impl Database {
    /// Create a new database instance (not yet opened)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db: Arc::new(RwLock::new(None)),
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Create and open with the default config
    pub fn open_at(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Self::new(path);
        db.open()?;
        Ok(db)
    }

    /// Open the database with default config
    pub fn open(&self) -> StorageResult<()> {
        self.open_with_config(DbConfig::default())
    }

    /// Open the database with custom config
    pub fn open_with_config(&self, config: DbConfig) -> StorageResult<()> {
        let mut db_guard = self.db.write();
        if db_guard.is_some() {
            return Err(StorageError::AlreadyOpen);
        }

        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Column::ALL
            .iter()
            .map(|column| ColumnFamilyDescriptor::new(column.name(), Options::default()))
            .collect();

        let db = RocksDB::open_cf_descriptors(&opts, &self.path, cf_descriptors)?;
        tracing::debug!(path = %self.path, "opened rocksdb store");
        *db_guard = Some(db);
        Ok(())
    }

    /// Close the database
    pub fn close(&self) {
        let mut db_guard = self.db.write();
        *db_guard = None;
    }

    /// Check if database is open
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Get database path
    pub fn path(&self) -> &str {
        &self.path
    }

    fn get_cf<'a>(db: &'a RocksDB, column: Column) -> StorageResult<Arc<BoundColumnFamily<'a>>> {
        db.cf_handle(column.name())
            .ok_or_else(|| StorageError::InvalidColumnFamily(column.name().to_string()))
    }

    fn scan_prefix(
        db: &RocksDB,
        column: Column,
        prefix: &[u8],
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = Self::get_cf(db, column)?;
        let mut out = Vec::new();
        for item in db.iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.into_vec(), value.into_vec()));
        }
        Ok(out)
    }
}

/// Smallest key greater than every key starting with `prefix`
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

impl KvStore for Database {
    fn get(&self, column: Column, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        let cf = Self::get_cf(db, column)?;
        Ok(db.get_cf(&cf, key)?)
    }

    fn iter_prefix(&self, column: Column, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;
        Self::scan_prefix(db, column, prefix)
    }

    fn write(&self, batch: WriteBatch) -> StorageResult<()> {
        let db_guard = self.db.read();
        let db = db_guard.as_ref().ok_or(StorageError::NotOpen)?;

        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.operations {
            match op {
                BatchOp::Put { column, key, value } => {
                    let cf = Self::get_cf(db, column)?;
                    rocks_batch.put_cf(&cf, &key, &value);
                }
                BatchOp::Delete { column, key } => {
                    let cf = Self::get_cf(db, column)?;
                    rocks_batch.delete_cf(&cf, &key);
                }
                BatchOp::DeletePrefix { column, prefix } => {
                    let cf = Self::get_cf(db, column)?;
                    match prefix_upper_bound(&prefix) {
                        Some(end) => rocks_batch.delete_range_cf(&cf, &prefix, &end),
                        None => {
                            for (key, _) in Self::scan_prefix(db, column, &prefix)? {
                                rocks_batch.delete_cf(&cf, &key);
                            }
                        }
                    }
                }
            }
        }

        db.write(rocks_batch)?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(dir.path()).unwrap();
        (dir, db)
    }

    fn put(db: &Database, column: Column, key: &[u8], value: &[u8]) {
        let mut batch = WriteBatch::new();
        batch.put(column, key, value);
        db.write(batch).unwrap();
    }

    #[test]
    fn test_open_close() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path());

        assert!(!db.is_open());
        db.open().unwrap();
        assert!(db.is_open());
        assert!(matches!(db.open(), Err(StorageError::AlreadyOpen)));
        db.close();
        assert!(!db.is_open());
    }

    #[test]
    fn test_not_open_error() {
        let db = Database::new("/tmp/nch_not_opened");
        assert!(matches!(db.get(Column::Accounts, b"key"), Err(StorageError::NotOpen)));
        assert!(matches!(db.write(WriteBatch::new()), Err(StorageError::NotOpen)));
    }

    #[test]
    fn test_columns_are_separate() {
        let (_dir, db) = open_temp();
        for column in Column::ALL {
            put(&db, column, b"key", column.name().as_bytes());
        }
        for column in Column::ALL {
            assert_eq!(db.get(column, b"key").unwrap(), Some(column.name().as_bytes().to_vec()));
        }
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(dir.path()).unwrap();
        put(&db, Column::Code, b"hash", b"code");
        db.close();

        db.open().unwrap();
        assert_eq!(db.get(Column::Code, b"hash").unwrap(), Some(b"code".to_vec()));
    }

    #[test]
    fn test_iter_and_delete_prefix() {
        let (_dir, db) = open_temp();
        let mut batch = WriteBatch::new();
        batch.put(Column::Storage, b"a\x01", b"1");
        batch.put(Column::Storage, b"a\x02", b"2");
        batch.put(Column::Storage, b"b\x01", b"3");
        db.write(batch).unwrap();

        let entries = db.iter_prefix(Column::Storage, b"a").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, b"a\x01".to_vec());

        let mut batch = WriteBatch::new();
        batch.delete_prefix(Column::Storage, b"a");
        batch.put(Column::Storage, b"a\x02", b"new");
        db.write(batch).unwrap();

        assert_eq!(db.get(Column::Storage, b"a\x01").unwrap(), None);
        assert_eq!(db.get(Column::Storage, b"a\x02").unwrap(), Some(b"new".to_vec()));
        assert_eq!(db.get(Column::Storage, b"b\x01").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_upper_bound(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(prefix_upper_bound(&[0xff, 0xff]), None);
    }
}
