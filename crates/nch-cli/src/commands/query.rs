//! Query commands

use anyhow::Result;
use clap::Subcommand;
use nch_vm::Keeper;
use serde_json::json;

use super::{parse_address, parse_h256};
use crate::output::Output;

/// Query subcommands
#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// Account balance
    Balance { address: String },
    /// Account nonce
    Nonce { address: String },
    /// Deployed code
    Code { address: String },
    /// One storage slot, or every non-zero slot when `key` is omitted
    Storage { address: String, key: Option<String> },
    /// Logs of a committed transaction
    Logs { tx_hash: String },
    /// Every account holding code
    Contracts,
}

impl QueryCommand {
    pub fn execute(self, keeper: &Keeper, json: bool) -> Result<()> {
        match self {
            QueryCommand::Balance { address } => {
                let address = parse_address(&address)?;
                let balance = keeper.get_balance(&address)?.to_string();
                Output::new(json).field("balance", &balance).message(&balance).print();
            }
            QueryCommand::Nonce { address } => {
                let nonce = keeper.get_nonce(&parse_address(&address)?)?;
                Output::new(json).field_u64("nonce", nonce).message(&nonce.to_string()).print();
            }
            QueryCommand::Code { address } => {
                let code = format!("0x{}", hex::encode(keeper.get_code(&parse_address(&address)?)?));
                Output::new(json).field("code", &code).message(&code).print();
            }
            QueryCommand::Storage { address, key: Some(key) } => {
                let value = keeper.get_state(&parse_address(&address)?, &parse_h256(&key)?)?;
                Output::new(json)
                    .field("value", &value.to_string())
                    .message(&value.to_string())
                    .print();
            }
            QueryCommand::Storage { address, key: None } => {
                let entries = keeper.storage_entries(&parse_address(&address)?)?;
                let text = entries
                    .iter()
                    .map(|(k, v)| format!("{k} = {v}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let map: serde_json::Map<_, _> = entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), json!(v.to_string())))
                    .collect();
                Output::new(json)
                    .field_value("storage", map.into())
                    .message(&text)
                    .print();
            }
            QueryCommand::Logs { tx_hash } => {
                let logs = keeper.get_logs(&parse_h256(&tx_hash)?)?;
                let value = serde_json::to_value(&logs)?;
                Output::new(json)
                    .message(&serde_json::to_string_pretty(&value)?)
                    .field_value("logs", value)
                    .print();
            }
            QueryCommand::Contracts => {
                let addresses: Vec<String> = keeper
                    .all_contract_addresses()?
                    .iter()
                    .map(|a| a.to_string())
                    .collect();
                Output::new(json)
                    .message(&addresses.join("\n"))
                    .field_value("contracts", json!(addresses))
                    .print();
            }
        }
        Ok(())
    }
}
