//! # nch-types
//!
//! Data types that cross the boundary of the contract VM:
//!
//! - [`Log`]: an event emitted by the LOG opcodes, with its transaction metadata
//! - [`MsgContract`] / [`MsgSend`]: the messages a transaction carries
//! - [`Registry`]: the message codec, built once at startup and passed by reference

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod log;
pub mod msg;
pub mod serde_hex;

pub use codec::{CodecError, Message, Registry};
pub use log::Log;
pub use msg::{MsgContract, MsgSend};
