//! Query and execution surface over committed state

use nch_primitives::{Address, H256, U256};
use nch_storage::StateDb;
use nch_types::{CodecError, Log, MsgContract, MsgSend, Registry};
use thiserror::Error;

use crate::codec::{MSG_CONTRACT, MSG_SEND};
use crate::context::{BlockContext, TxContext};
use crate::error::VmResult;
use crate::gas::GasSchedule;
use crate::params::VmParams;
use crate::state::CommitStateDB;
use crate::transition::{apply_message, Message, TransitionError, TxOutput};

/// Native stack of the execution thread. Nested calls recurse natively, so
/// this has to hold `max_call_depth` interpreter frames in a debug build.
const EXECUTION_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Errors from [`Keeper::handle`]
#[derive(Debug, Error)]
pub enum KeeperError {
    /// Message bytes could not be decoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transaction rejected
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Decoded message is not one the VM handles
    #[error("unsupported message type: {0}")]
    UnsupportedMessage(&'static str),
}

/// Entry point of the VM module: runs transactions and answers queries.
///
/// Every transaction gets a fresh [`CommitStateDB`] that is committed to the
/// store when the transaction completes.
#[derive(Clone)]
pub struct Keeper {
    state: StateDb,
    params: VmParams,
}

impl Keeper {
    /// Create a keeper over committed state
    pub fn new(state: StateDb, params: VmParams) -> Self {
        Self { state, params }
    }

    /// VM parameters
    pub fn params(&self) -> &VmParams {
        &self.params
    }

    fn view(&self) -> CommitStateDB {
        CommitStateDB::new(self.state.clone())
    }

    pub fn get_code(&self, address: &Address) -> VmResult<Vec<u8>> {
        self.view().get_code(address)
    }

    pub fn get_state(&self, address: &Address, key: &H256) -> VmResult<H256> {
        self.view().get_state(address, key)
    }

    /// Every non-zero storage slot of an account
    pub fn storage_entries(&self, address: &Address) -> VmResult<Vec<(H256, H256)>> {
        Ok(self.state.storage_entries(address)?)
    }

    pub fn get_logs(&self, tx_hash: &H256) -> VmResult<Vec<Log>> {
        self.view().get_logs(tx_hash)
    }

    pub fn all_contract_addresses(&self) -> VmResult<Vec<Address>> {
        self.view().all_contract_addresses()
    }

    pub fn get_balance(&self, address: &Address) -> VmResult<U256> {
        self.view().get_balance(address)
    }

    pub fn get_nonce(&self, address: &Address) -> VmResult<u64> {
        self.view().get_nonce(address)
    }

    /// Credit an account outside of any transaction, as genesis does
    pub fn add_balance(&self, address: &Address, amount: U256) -> VmResult<()> {
        let mut state = self.view();
        state.add_balance(address, amount)?;
        state.commit(false)
    }

    /// Run one transaction and commit its effects.
    ///
    /// Execution happens on a dedicated thread sized for the deepest call
    /// chain, whatever the stack of the calling thread.
    pub fn apply_message(
        &self,
        block: &BlockContext,
        tx: &TxContext,
        msg: &Message,
    ) -> Result<TxOutput, TransitionError> {
        std::thread::scope(|scope| {
            let handle = std::thread::Builder::new()
                .name("nch_vm_executor".to_string())
                .stack_size(EXECUTION_STACK_SIZE)
                .spawn_scoped(scope, || self.execute(block, tx, msg))
                .map_err(|e| {
                    TransitionError::Executor(format!("failed to spawn execution thread: {e}"))
                })?;
            handle
                .join()
                .map_err(|_| TransitionError::Executor("execution thread panicked".to_string()))?
        })
    }

    fn execute(
        &self,
        block: &BlockContext,
        tx: &TxContext,
        msg: &Message,
    ) -> Result<TxOutput, TransitionError> {
        let mut state = self.view();
        let output = apply_message(&mut state, block, tx, &self.params, msg)?;
        let schedule = GasSchedule::for_version(self.params.version_at(block.number));
        state
            .commit(schedule.empty_is_absent)
            .map_err(TransitionError::from)?;
        tracing::info!(
            tx = %tx.tx_hash,
            success = output.is_success(),
            gas_used = output.gas_used,
            "transaction committed"
        );
        Ok(output)
    }

    /// Decode a registry-encoded message and apply it
    pub fn handle(
        &self,
        registry: &Registry,
        bytes: &[u8],
        block: &BlockContext,
        tx: &TxContext,
        gas_limit: u64,
    ) -> Result<TxOutput, KeeperError> {
        let decoded = registry.decode(bytes)?;
        let msg = match decoded.name() {
            MSG_CONTRACT => Message::from_contract_msg(&decoded.downcast::<MsgContract>()?, gas_limit),
            MSG_SEND => {
                let send = decoded.downcast::<MsgSend>()?;
                Message::call(send.from, send.to, Vec::new(), send.amount, gas_limit)
            }
            other => return Err(KeeperError::UnsupportedMessage(other)),
        };
        Ok(self.apply_message(block, tx, &msg)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::message_registry;
    use nch_storage::MemoryDb;
    use std::sync::Arc;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn keeper() -> Keeper {
        Keeper::new(StateDb::new(Arc::new(MemoryDb::new())), VmParams::default())
    }

    fn keeper_with_code(address: Address, code: Vec<u8>) -> Keeper {
        let store = StateDb::new(Arc::new(MemoryDb::new()));
        let mut seed = CommitStateDB::new(store.clone());
        seed.set_code(&address, code).unwrap();
        seed.commit(true).unwrap();
        Keeper::new(store, VmParams::default())
    }

    #[test]
    fn test_funding_and_transfer_are_committed() {
        let keeper = keeper();
        keeper.add_balance(&addr(1), U256::from(1000u64)).unwrap();

        let msg = Message::call(addr(1), addr(2), Vec::new(), U256::from(400u64), 30_000);
        let out = keeper
            .apply_message(&BlockContext::default(), &TxContext::default(), &msg)
            .unwrap();
        assert!(out.is_success());
        assert_eq!(keeper.get_balance(&addr(1)).unwrap(), U256::from(600u64));
        assert_eq!(keeper.get_balance(&addr(2)).unwrap(), U256::from(400u64));
        assert_eq!(keeper.get_nonce(&addr(1)).unwrap(), 1);
    }

    #[test]
    fn test_handle_decodes_registered_messages() {
        let keeper = keeper();
        let registry = message_registry().unwrap();
        keeper.add_balance(&addr(1), U256::from(10u64)).unwrap();

        let send = MsgSend {
            from: addr(1),
            to: addr(2),
            amount: U256::from(3u64),
        };
        let bytes = registry.encode(&send).unwrap();
        let out = keeper
            .handle(&registry, &bytes, &BlockContext::default(), &TxContext::default(), 30_000)
            .unwrap();
        assert!(out.is_success());
        assert_eq!(keeper.get_balance(&addr(2)).unwrap(), U256::from(3u64));

        let garbage = keeper.handle(
            &registry,
            b"{\"type\":\"nch/Unknown\",\"value\":{}}",
            &BlockContext::default(),
            &TxContext::default(),
            30_000,
        );
        assert!(matches!(garbage, Err(KeeperError::Codec(CodecError::UnknownType(_)))));
    }

    #[test]
    fn test_deploy_then_query() {
        let keeper = keeper();
        // init code returning runtime code 0x00 (STOP): PUSH1 0 PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 RETURN
        let init = hex::decode("600060005360016000f3").unwrap();
        let msg = Message::create(addr(1), init, U256::zero(), 100_000);
        let out = keeper
            .apply_message(&BlockContext::default(), &TxContext::default(), &msg)
            .unwrap();
        let contract = out.contract_address.unwrap();
        assert_eq!(keeper.get_code(&contract).unwrap(), vec![0x00]);
        assert_eq!(keeper.all_contract_addresses().unwrap(), vec![contract]);
        assert_eq!(keeper.get_nonce(&contract).unwrap(), 1);
    }

    #[test]
    fn test_call_chain_to_max_depth_runs_from_a_small_stack() {
        let contract = addr(0xc0);
        // SSTORE(0, SLOAD(0) + 1); CALL(GAS, ADDRESS, 0, 0, 0, 0, 0); STOP
        let code = hex::decode("60005460010160005560006000600060006000305af100").unwrap();
        let keeper = keeper_with_code(contract, code);
        let msg = Message::call(addr(1), contract, Vec::new(), U256::zero(), 1_000_000_000_000_000);

        let runner = keeper.clone();
        let out = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                runner.apply_message(&BlockContext::default(), &TxContext::default(), &msg)
            })
            .unwrap()
            .join()
            .unwrap()
            .unwrap();

        assert!(out.is_success());
        // frames at depths 1 through 1025 each bumped the counter
        assert_eq!(
            keeper.get_state(&contract, &H256::ZERO).unwrap(),
            H256::from_word(U256::from(1025u64))
        );
    }

    #[test]
    fn test_logs_of_transactions_sharing_a_hash_accumulate() {
        let contract = addr(0xc0);
        // LOG0(0, 0); STOP
        let keeper = keeper_with_code(contract, vec![0x60, 0x00, 0x60, 0x00, 0xa0, 0x00]);
        let msg = Message::call(addr(1), contract, Vec::new(), U256::zero(), 100_000);

        for _ in 0..2 {
            let out = keeper
                .apply_message(&BlockContext::default(), &TxContext::default(), &msg)
                .unwrap();
            assert_eq!(out.logs.len(), 1);
        }

        let logs = keeper.get_logs(&TxContext::default().tx_hash).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| log.address == contract));
    }
}
