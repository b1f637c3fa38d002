//! Errors raised while parsing primitives from text or bytes

use thiserror::Error;
use crate::address::AddressError;
use crate::hash::HashError;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    /// A word literal that is neither decimal nor 0x-prefixed hex, or exceeds 256 bits
    #[error("invalid word literal: {0}")]
    InvalidWord(String),
}
