//! Journaled world state

mod commit_db;
mod journal;
mod state_object;

pub use commit_db::CommitStateDB;
