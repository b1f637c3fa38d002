//! CLI integration tests for nchvm

use std::path::Path;
use std::process::Command;

const ALICE: &str = "0x0101010101010101010101010101010101010101";
const BOB: &str = "0x0202020202020202020202020202020202020202";
/// Init code deploying the single-byte runtime code 0x00
const INIT: &str = "0x600060005360016000f3";

/// Helper to run the CLI with arguments
fn run_nchvm(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_nchvm"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let mut all = vec!["--json"];
    all.extend_from_slice(args);
    let output = run_nchvm(&all);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

fn db_arg(dir: &Path) -> String {
    dir.to_string_lossy().to_string()
}

// ==================== Help ====================

#[test]
fn test_cli_help() {
    let output = run_nchvm(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["fund", "call", "create", "apply", "query"] {
        assert!(stdout.contains(cmd), "missing {cmd}");
    }
}

#[test]
fn test_invalid_address_fails() {
    let output = run_nchvm(&["fund", "0x1234", "10"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid address"));
}

// ==================== Persistent store ====================

#[test]
fn test_fund_transfer_and_query_across_invocations() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = db_arg(dir.path());

    run_json(&["--db", &db, "fund", ALICE, "1000"]);
    let out = run_json(&["--db", &db, "call", "--from", ALICE, "--to", BOB, "--value", "250"]);
    assert_eq!(out["status"], "success");
    assert_eq!(out["gas_used"], 21000);

    let balance = run_json(&["--db", &db, "query", "balance", BOB]);
    assert_eq!(balance["balance"], "250");
    let nonce = run_json(&["--db", &db, "query", "nonce", ALICE]);
    assert_eq!(nonce["nonce"], 1);
}

#[test]
fn test_create_then_query_code() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = db_arg(dir.path());

    let out = run_json(&["--db", &db, "create", "--from", ALICE, "--code", INIT]);
    assert_eq!(out["status"], "success");
    let contract = out["contract_address"].as_str().unwrap().to_string();

    let code = run_json(&["--db", &db, "query", "code", &contract]);
    assert_eq!(code["code"], "0x00");
    let contracts = run_json(&["--db", &db, "query", "contracts"]);
    assert_eq!(contracts["contracts"], serde_json::json!([contract]));
}

// ==================== In-memory apply ====================

#[test]
fn test_apply_file_in_memory() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("txs.json");
    let input = serde_json::json!({
        "alloc": { ALICE: "100" },
        "messages": [
            { "type": "nch/send", "value": { "from": ALICE, "to": BOB, "amount": "0x28" } },
            { "type": "nch/MsgContract", "value": { "from": ALICE, "payload": INIT } }
        ]
    });
    std::fs::write(&file, serde_json::to_vec(&input).unwrap()).unwrap();

    let output = run_nchvm(&["apply", &file.to_string_lossy()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Status: success").count(), 2);
    assert!(stdout.contains("Contract: "));
}
