//! # nch-storage
//!
//! Persistent store consumed by the contract VM.
//!
//! This crate provides:
//! - [`KvStore`]: column-oriented key-value abstraction with atomic batches
//! - [`MemoryDb`]: in-memory backend used by tests and ephemeral runs
//! - [`Database`]: RocksDB backend
//! - [`StateDb`]: typed access to accounts, code, storage slots, logs and preimages

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod db;
mod error;
pub mod keys;
mod kv;
mod memory;
mod state;

pub use account::{Account, StateReader};
pub use db::{Database, DbConfig};
pub use error::{StorageError, StorageResult};
pub use kv::{Column, KvStore, WriteBatch};
pub use memory::MemoryDb;
pub use state::{StateChanges, StateDb};
