//! # nch-crypto
//!
//! Keccak-256 hashing used for code hashes, the KECCAK256 opcode,
//! contract address derivation and storage preimages.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, keccak256_concat, EMPTY_CODE_HASH};
