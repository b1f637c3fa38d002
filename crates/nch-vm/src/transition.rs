//! Applying one transaction message to the world state

use nch_primitives::{Address, H256, U256};
use nch_types::{Log, MsgContract};
use thiserror::Error;

use crate::context::{BlockContext, TxContext};
use crate::error::VmError;
use crate::evm::{CallStatus, Evm};
use crate::gas::{intrinsic_gas, GasSchedule};
use crate::params::VmParams;
use crate::state::CommitStateDB;

/// Errors that reject a transaction as a whole.
///
/// The world state is left as it was before the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Gas limit does not cover the intrinsic cost
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGasTooLow {
        /// Gas supplied
        have: u64,
        /// Intrinsic cost
        want: u64,
    },

    /// Call message without a recipient
    #[error("call message has no recipient")]
    MissingRecipient,

    /// Fatal VM condition
    #[error("vm error: {0}")]
    Vm(#[from] VmError),

    /// The execution thread could not be spawned or panicked
    #[error("executor: {0}")]
    Executor(String),
}

/// What a message does
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Message call to `to`
    Call,
    /// CREATE-style deployment
    Create,
    /// CREATE2-style deployment
    Create2 {
        /// Salt mixed into the address
        salt: H256,
    },
}

/// A transaction as the VM sees it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Sender
    pub sender: Address,
    /// Recipient of a call
    pub to: Option<Address>,
    /// Value transferred
    pub value: U256,
    /// Call data or init code
    pub data: Vec<u8>,
    /// Gas available, intrinsic cost included
    pub gas_limit: u64,
    /// Call or creation
    pub kind: MessageKind,
}

impl Message {
    /// Message call
    pub fn call(sender: Address, to: Address, data: Vec<u8>, value: U256, gas_limit: u64) -> Self {
        Self {
            sender,
            to: Some(to),
            value,
            data,
            gas_limit,
            kind: MessageKind::Call,
        }
    }

    /// Contract creation
    pub fn create(sender: Address, init_code: Vec<u8>, value: U256, gas_limit: u64) -> Self {
        Self {
            sender,
            to: None,
            value,
            data: init_code,
            gas_limit,
            kind: MessageKind::Create,
        }
    }

    /// Contract creation at a salted address
    pub fn create2(
        sender: Address,
        init_code: Vec<u8>,
        salt: H256,
        value: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind: MessageKind::Create2 { salt },
            ..Self::create(sender, init_code, value, gas_limit)
        }
    }

    /// From a decoded contract message
    pub fn from_contract_msg(msg: &MsgContract, gas_limit: u64) -> Self {
        match msg.to {
            Some(to) => Self::call(msg.from, to, msg.payload.to_vec(), msg.amount, gas_limit),
            None => Self::create(msg.from, msg.payload.to_vec(), msg.amount, gas_limit),
        }
    }

    /// Deploys a contract
    pub fn is_create(&self) -> bool {
        !matches!(self.kind, MessageKind::Call)
    }
}

/// Result of an applied transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    /// Outcome of the top-level frame
    pub status: CallStatus,
    /// Return data, revert reason, or deployed code
    pub output: Vec<u8>,
    /// Gas consumed after the refund
    pub gas_used: u64,
    /// Refund granted, at most half of the gas consumed
    pub gas_refunded: u64,
    /// Logs of the frames that were not reverted
    pub logs: Vec<Log>,
    /// Address of the deployed contract
    pub contract_address: Option<Address>,
}

impl TxOutput {
    /// True when the top-level frame completed
    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// Execute `msg` against `state` without committing.
///
/// Frame failures are reported in [`TxOutput::status`]. A fatal VM error
/// reverts every change of the transaction and is returned as `Err`.
pub fn apply_message(
    state: &mut CommitStateDB,
    block: &BlockContext,
    tx: &TxContext,
    params: &VmParams,
    msg: &Message,
) -> Result<TxOutput, TransitionError> {
    let schedule = GasSchedule::for_version(params.version_at(block.number));
    let intrinsic = intrinsic_gas(&msg.data, msg.is_create(), schedule)?;
    if msg.gas_limit < intrinsic {
        return Err(TransitionError::IntrinsicGasTooLow {
            have: msg.gas_limit,
            want: intrinsic,
        });
    }
    let gas = msg.gas_limit - intrinsic;

    state.prepare(tx.tx_hash, tx.tx_index, block.hash, block.number);
    let snapshot = state.snapshot();

    let result = {
        let mut evm = Evm::new(state, block, tx, params);
        match (&msg.kind, msg.to) {
            (MessageKind::Call, Some(to)) => {
                let nonce = evm.state().get_nonce(&msg.sender)?;
                evm.state().set_nonce(&msg.sender, nonce.saturating_add(1))?;
                evm.call(msg.sender, to, msg.data.clone(), gas, msg.value)
            }
            (MessageKind::Call, None) => return Err(TransitionError::MissingRecipient),
            (MessageKind::Create, _) => evm.create(msg.sender, msg.data.clone(), gas, msg.value),
            (MessageKind::Create2 { salt }, _) => {
                evm.create2(msg.sender, msg.data.clone(), gas, msg.value, *salt)
            }
        }
    };

    let out = match result {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(error = %e, tx = %tx.tx_hash, "transaction aborted");
            state.revert_to_snapshot(snapshot)?;
            return Err(e.into());
        }
    };

    let used = msg.gas_limit - out.gas_left;
    let refund = state.get_refund().min(used / 2);
    tracing::debug!(
        status = ?out.status,
        gas_used = used - refund,
        refund,
        "message applied"
    );

    Ok(TxOutput {
        status: out.status,
        output: out.output,
        gas_used: used - refund,
        gas_refunded: refund,
        logs: state.logs(),
        contract_address: out.address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::ProtocolVersion;
    use crate::testutil::TestEnv;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_intrinsic_gas_too_low() {
        let mut env = TestEnv::new(ProtocolVersion::V1);
        let msg = Message::call(addr(1), addr(2), vec![1], U256::zero(), 21_000);
        let err = apply_message(&mut env.state, &env.block, &env.tx, &env.params, &msg).unwrap_err();
        assert_eq!(err, TransitionError::IntrinsicGasTooLow { have: 21_000, want: 21_016 });
        assert_eq!(env.state.get_nonce(&addr(1)).unwrap(), 0);
    }

    #[test]
    fn test_call_without_recipient_is_rejected() {
        let mut env = TestEnv::new(ProtocolVersion::V1);
        let msg = Message {
            to: None,
            ..Message::call(addr(1), addr(2), vec![], U256::zero(), 50_000)
        };
        let err = apply_message(&mut env.state, &env.block, &env.tx, &env.params, &msg).unwrap_err();
        assert_eq!(err, TransitionError::MissingRecipient);
    }

    #[test]
    fn test_call_bumps_nonce_and_charges_intrinsic_gas() {
        let mut env = TestEnv::new(ProtocolVersion::V1);
        let msg = Message::call(addr(1), addr(2), vec![], U256::zero(), 50_000);
        let out = apply_message(&mut env.state, &env.block, &env.tx, &env.params, &msg).unwrap();
        assert!(out.is_success());
        assert_eq!(out.gas_used, 21_000);
        assert_eq!(env.state.get_nonce(&addr(1)).unwrap(), 1);
    }

    #[test]
    fn test_message_kinds() {
        let msg = MsgContract {
            from: addr(1),
            to: None,
            payload: vec![0x00].into(),
            amount: U256::zero(),
        };
        assert!(Message::from_contract_msg(&msg, 1).is_create());
        let salted = Message::create2(addr(1), vec![], H256::ZERO, U256::zero(), 1);
        assert!(salted.is_create());
        assert_eq!(salted.to, None);
    }
}
