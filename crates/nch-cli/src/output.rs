//! Output formatting

use nch_vm::{CallStatus, TxOutput};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Output builder: a JSON object in `--json` mode, a plain message otherwise
pub struct Output {
    json_mode: bool,
    fields: BTreeMap<String, Value>,
    message: Option<String>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            fields: BTreeMap::new(),
            message: None,
        }
    }

    /// Add a string field to the output
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a u64 field to the output
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a JSON value field to the output
    pub fn field_value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Set the human-readable message
    pub fn message(mut self, msg: &str) -> Self {
        self.message = Some(msg.to_string());
        self
    }

    /// Print the output
    pub fn print(self) {
        if self.json_mode {
            let json = json!(self.fields);
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        } else if let Some(msg) = self.message {
            println!("{}", msg);
        }
    }
}

fn status_text(status: &CallStatus) -> String {
    match status {
        CallStatus::Success => "success".to_string(),
        CallStatus::Reverted => "reverted".to_string(),
        CallStatus::Failed(e) => format!("failed: {e}"),
    }
}

/// Summary of an applied transaction
pub fn tx_output(json: bool, out: &TxOutput) -> Output {
    let status = status_text(&out.status);
    let output_hex = format!("0x{}", hex::encode(&out.output));
    let mut text = format!(
        "Status: {status}\nGas used: {}\nGas refunded: {}\nOutput: {output_hex}\nLogs: {}",
        out.gas_used,
        out.gas_refunded,
        out.logs.len()
    );
    let mut output = Output::new(json)
        .field("status", &status)
        .field_u64("gas_used", out.gas_used)
        .field_u64("gas_refunded", out.gas_refunded)
        .field("output", &output_hex)
        .field_value("logs", serde_json::to_value(&out.logs).unwrap_or(Value::Null));
    if let Some(error) = out.status.error() {
        output = output.field("error", &error.to_string());
    }
    if let Some(address) = out.contract_address {
        text.push_str(&format!("\nContract: {address}"));
        output = output.field("contract_address", &address.to_string());
    }
    output.message(&text)
}
