//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::query::QueryCommand;
use crate::commands::tx::{ApplyArgs, CallArgs, CreateArgs, FundArgs};

/// Run contract transactions against a local state store
#[derive(Parser, Debug)]
#[command(name = "nchvm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// RocksDB directory; state is kept in memory when absent
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// VM parameters file (JSON)
    #[arg(long, global = true)]
    pub params: Option<PathBuf>,

    /// Block height the transactions execute at
    #[arg(long, global = true, default_value = "0")]
    pub height: u64,

    /// Chain id returned by CHAINID
    #[arg(long, global = true, default_value = "1")]
    pub chain_id: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Credit an account
    Fund(FundArgs),
    /// Call a contract or transfer value
    Call(CallArgs),
    /// Deploy a contract
    Create(CreateArgs),
    /// Apply a file of funding entries and encoded messages
    Apply(ApplyArgs),
    /// Read committed state
    #[command(subcommand)]
    Query(QueryCommand),
}
