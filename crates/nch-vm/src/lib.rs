//! # nch-vm
//!
//! Contract virtual machine of the nch chain.
//!
//! - [`Evm`]: call and create entry points over a journaled [`CommitStateDB`]
//! - [`interpreter`]: the fetch/charge/execute loop driven by a [`JumpTable`]
//! - [`GasSchedule`]: per [`ProtocolVersion`] gas prices and feature switches
//! - [`apply_message`]: one transaction with intrinsic gas and refunds
//! - [`Keeper`]: commits transactions to a [`nch_storage::StateDb`] and answers queries

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod address;
pub mod codec;
pub mod context;
pub mod error;
pub mod evm;
pub mod gas;
mod instructions;
pub mod interpreter;
pub mod jump_table;
pub mod keeper;
pub mod memory;
pub mod opcode;
pub mod params;
pub mod stack;
pub mod state;
pub mod transition;
pub mod word;

pub use address::{create2_address, create_address};
pub use codec::{message_registry, register_messages};
pub use context::{BlockContext, TxContext};
pub use error::{VmError, VmResult};
pub use evm::{CallOutput, CallStatus, Evm};
pub use gas::{GasSchedule, ProtocolVersion};
pub use interpreter::{Contract, Frame};
pub use jump_table::JumpTable;
pub use keeper::{Keeper, KeeperError};
pub use memory::Memory;
pub use opcode::OpCode;
pub use params::{ParamsError, VmParams};
pub use stack::Stack;
pub use state::CommitStateDB;
pub use transition::{apply_message, Message, MessageKind, TransitionError, TxOutput};
pub use word::Word;

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use nch_storage::{MemoryDb, StateDb};

    use crate::{BlockContext, CommitStateDB, Evm, ProtocolVersion, TxContext, VmParams};

    /// In-memory state plus the contexts an [`Evm`] borrows
    pub struct TestEnv {
        pub state: CommitStateDB,
        pub block: BlockContext,
        pub tx: TxContext,
        pub params: VmParams,
    }

    impl TestEnv {
        pub fn new(version: ProtocolVersion) -> Self {
            Self {
                state: CommitStateDB::new(StateDb::new(Arc::new(MemoryDb::new()))),
                block: BlockContext::default(),
                tx: TxContext::default(),
                params: VmParams::with_version(version),
            }
        }

        pub fn evm(&mut self) -> Evm<'_> {
            Evm::new(&mut self.state, &self.block, &self.tx, &self.params)
        }
    }
}
