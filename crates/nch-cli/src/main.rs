//! # nchvm
//!
//! Command-line runner for the nch contract VM.
//!
//! ```bash
//! nchvm --db ./state fund 0x01..01 1000
//! nchvm --db ./state create --from 0x01..01 --code 0x600060005360016000f3
//! nchvm --db ./state call --from 0x01..01 --to 0x... --data 0x...
//! nchvm --db ./state query storage 0x...
//! nchvm apply txs.json
//! ```

mod cli;
mod commands;
mod error;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nch_storage::{Database, KvStore, MemoryDb, StateDb};
use nch_vm::{BlockContext, Keeper, VmParams};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
pub use error::CliError;

fn open_keeper(cli: &Cli) -> Result<Keeper> {
    let params = match &cli.params {
        Some(path) => {
            VmParams::load(path).with_context(|| format!("loading params {}", path.display()))?
        }
        None => VmParams::default(),
    };
    let kv: Arc<dyn KvStore> = match &cli.db {
        Some(path) => Arc::new(
            Database::open_at(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Arc::new(MemoryDb::new()),
    };
    tracing::info!(
        version = ?params.version_at(cli.height),
        persistent = cli.db.is_some(),
        "state opened"
    );
    Ok(Keeper::new(StateDb::new(kv), params))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let keeper = open_keeper(&cli)?;
    let block = BlockContext {
        number: cli.height,
        chain_id: cli.chain_id.into(),
        ..BlockContext::default()
    };

    match cli.command {
        Command::Fund(args) => commands::tx::fund(&keeper, args, cli.json),
        Command::Call(args) => commands::tx::call(&keeper, &block, args, cli.json),
        Command::Create(args) => commands::tx::create(&keeper, &block, args, cli.json),
        Command::Apply(args) => commands::tx::apply(&keeper, &block, args, cli.json),
        Command::Query(cmd) => cmd.execute(&keeper, cli.json),
    }
}
