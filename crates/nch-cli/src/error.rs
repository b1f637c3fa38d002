//! CLI error types

use thiserror::Error;

/// Errors in command arguments and input files
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Input file does not have the expected shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
