//! Transaction commands

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nch_primitives::Address;
use nch_vm::{message_registry, BlockContext, Keeper, Message, TxContext};
use serde::Deserialize;

use super::{parse_address, parse_amount, parse_h256, parse_hex};
use crate::output::{tx_output, Output};
use crate::CliError;

#[derive(Args, Debug)]
pub struct FundArgs {
    /// Account to credit
    pub address: String,
    /// Amount, decimal or 0x-hex
    pub amount: String,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Sender
    #[arg(long)]
    pub from: String,
    /// Recipient
    #[arg(long)]
    pub to: String,
    /// Call data (hex)
    #[arg(long, default_value = "")]
    pub data: String,
    /// Value transferred
    #[arg(long, default_value = "0")]
    pub value: String,
    /// Gas limit
    #[arg(long, default_value = "1000000")]
    pub gas: u64,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Sender
    #[arg(long)]
    pub from: String,
    /// Init code (hex)
    #[arg(long)]
    pub code: String,
    /// Value endowed to the contract
    #[arg(long, default_value = "0")]
    pub value: String,
    /// Gas limit
    #[arg(long, default_value = "3000000")]
    pub gas: u64,
    /// Salt for a CREATE2-style address
    #[arg(long)]
    pub salt: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON file: `{"alloc": {address: amount}, "messages": [envelope, ...]}`
    pub file: PathBuf,
    /// Gas limit of every message
    #[arg(long, default_value = "3000000")]
    pub gas: u64,
}

/// Contents of an `apply` input file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApplyFile {
    alloc: BTreeMap<String, String>,
    messages: Vec<serde_json::Value>,
}

/// Transaction identity derived from the sender and its next nonce
fn tx_context(keeper: &Keeper, sender: &Address, tx_index: u64) -> Result<TxContext> {
    let nonce = keeper.get_nonce(sender)?;
    Ok(TxContext {
        origin: *sender,
        tx_hash: nch_crypto::keccak256_concat(&[sender.as_bytes(), &nonce.to_be_bytes()]),
        tx_index,
        ..TxContext::default()
    })
}

fn run(keeper: &Keeper, block: &BlockContext, msg: &Message, json: bool) -> Result<()> {
    let tx = tx_context(keeper, &msg.sender, 0)?;
    let out = keeper.apply_message(block, &tx, msg)?;
    tx_output(json, &out).field("tx_hash", &tx.tx_hash.to_string()).print();
    Ok(())
}

pub fn fund(keeper: &Keeper, args: FundArgs, json: bool) -> Result<()> {
    let address = parse_address(&args.address)?;
    let amount = parse_amount(&args.amount)?;
    keeper.add_balance(&address, amount)?;
    let balance = keeper.get_balance(&address)?;
    Output::new(json)
        .field("address", &address.to_string())
        .field("balance", &balance.to_string())
        .message(&format!("{address}: {balance}"))
        .print();
    Ok(())
}

pub fn call(keeper: &Keeper, block: &BlockContext, args: CallArgs, json: bool) -> Result<()> {
    let msg = Message::call(
        parse_address(&args.from)?,
        parse_address(&args.to)?,
        parse_hex(&args.data)?,
        parse_amount(&args.value)?,
        args.gas,
    );
    run(keeper, block, &msg, json)
}

pub fn create(keeper: &Keeper, block: &BlockContext, args: CreateArgs, json: bool) -> Result<()> {
    let from = parse_address(&args.from)?;
    let code = parse_hex(&args.code)?;
    let value = parse_amount(&args.value)?;
    let msg = match args.salt.as_deref() {
        Some(salt) => Message::create2(from, code, parse_h256(salt)?, value, args.gas),
        None => Message::create(from, code, value, args.gas),
    };
    run(keeper, block, &msg, json)
}

pub fn apply(keeper: &Keeper, block: &BlockContext, args: ApplyArgs, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let file: ApplyFile = serde_json::from_str(&content)?;

    for (address, amount) in &file.alloc {
        keeper.add_balance(&parse_address(address)?, parse_amount(amount)?)?;
    }

    let registry = message_registry()?;
    let mut results = Vec::with_capacity(file.messages.len());
    for (index, envelope) in file.messages.iter().enumerate() {
        let sender = envelope
            .pointer("/value/from")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CliError::InvalidInput(format!("message {index} has no sender")))?;
        let tx = tx_context(keeper, &parse_address(sender)?, index as u64)?;
        let bytes = serde_json::to_vec(envelope)?;
        let out = keeper
            .handle(&registry, &bytes, block, &tx, args.gas)
            .with_context(|| format!("message {index}"))?;
        tracing::debug!(index, tx = %tx.tx_hash, "message applied");
        results.push((tx.tx_hash, out));
    }

    for (tx_hash, out) in &results {
        tx_output(json, out).field("tx_hash", &tx_hash.to_string()).print();
    }
    Ok(())
}
