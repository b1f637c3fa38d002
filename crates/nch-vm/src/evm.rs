//! Call and creation framework

use nch_crypto::EMPTY_CODE_HASH;
use nch_primitives::{Address, H256, U256};

use crate::address::{create2_address, create_address};
use crate::context::{BlockContext, TxContext};
use crate::error::{VmError, VmResult};
use crate::gas::{cost, GasSchedule, ProtocolVersion};
use crate::interpreter::{self, Contract, Frame, Halt};
use crate::jump_table::JumpTable;
use crate::params::VmParams;
use crate::state::CommitStateDB;

/// How a call or creation frame ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallStatus {
    /// Completed; state changes kept
    Success,
    /// REVERT; state changes undone, unused gas returned
    Reverted,
    /// Any other error; state changes undone
    Failed(VmError),
}

impl CallStatus {
    /// Error kind behind an unsuccessful frame; REVERT maps to
    /// [`VmError::ExecutionReverted`]
    pub fn error(&self) -> Option<VmError> {
        match self {
            CallStatus::Success => None,
            CallStatus::Reverted => Some(VmError::ExecutionReverted),
            CallStatus::Failed(e) => Some(e.clone()),
        }
    }
}

/// Result of a call or creation frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutput {
    /// Outcome
    pub status: CallStatus,
    /// Return data, revert reason, or deployed code
    pub output: Vec<u8>,
    /// Gas handed back to the caller
    pub gas_left: u64,
    /// Address of the new contract, for successful creations
    pub address: Option<Address>,
}

impl CallOutput {
    fn success(output: Vec<u8>, gas_left: u64) -> Self {
        Self {
            status: CallStatus::Success,
            output,
            gas_left,
            address: None,
        }
    }

    /// Failure before any code ran; the gas goes back untouched
    fn rejected(error: VmError, gas_left: u64) -> Self {
        Self {
            status: CallStatus::Failed(error),
            output: Vec::new(),
            gas_left,
            address: None,
        }
    }

    /// True when the frame completed
    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// Machine executing one transaction.
///
/// Holds the world state for the duration of the transaction together with
/// the block and transaction context and the protocol version's gas rules.
pub struct Evm<'a> {
    pub(crate) state: &'a mut CommitStateDB,
    pub(crate) block: &'a BlockContext,
    pub(crate) tx: &'a TxContext,
    pub(crate) params: &'a VmParams,
    pub(crate) schedule: &'static GasSchedule,
    table: Box<JumpTable>,
    depth: usize,
    read_only: bool,
    /// Gas reserved for the pending CALL-family op by its dynamic gas function
    pub(crate) call_gas_temp: u64,
}

impl<'a> Evm<'a> {
    /// Machine for the protocol version active at the block height
    pub fn new(
        state: &'a mut CommitStateDB,
        block: &'a BlockContext,
        tx: &'a TxContext,
        params: &'a VmParams,
    ) -> Self {
        let schedule = GasSchedule::for_version(params.version_at(block.number));
        Self {
            state,
            block,
            tx,
            params,
            schedule,
            table: Box::new(JumpTable::new(schedule)),
            depth: 0,
            read_only: false,
            call_gas_temp: 0,
        }
    }

    /// Active protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.schedule.version
    }

    /// Active gas schedule
    pub fn schedule(&self) -> &'static GasSchedule {
        self.schedule
    }

    /// World state
    pub fn state(&mut self) -> &mut CommitStateDB {
        self.state
    }

    /// Current call depth; zero outside any frame
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn table(&self) -> &JumpTable {
        &self.table
    }

    pub(crate) fn read_only(&self) -> bool {
        self.read_only
    }

    fn transfer(&mut self, from: &Address, to: &Address, value: U256) -> VmResult<()> {
        if value.is_zero() {
            return Ok(());
        }
        self.state.sub_balance(from, value)?;
        self.state.add_balance(to, value)
    }

    fn can_transfer(&mut self, from: &Address, value: U256) -> VmResult<bool> {
        Ok(value.is_zero() || self.state.get_balance(from)? >= value)
    }

    fn depth_exceeded(&self) -> bool {
        self.depth > self.params.max_call_depth
    }

    /// Run a frame one level deeper; yields the halt and the gas left over
    fn run_frame(&mut self, contract: Contract, read_only: bool) -> (VmResult<Halt>, u64) {
        let outer_read_only = self.read_only;
        self.read_only |= read_only;
        self.depth += 1;

        let mut frame = Box::new(Frame::new(contract));
        let result = interpreter::run(self, &mut frame);

        self.depth -= 1;
        self.read_only = outer_read_only;
        (result, frame.contract.gas)
    }

    /// Map a frame result to a call output, reverting to `snapshot` unless
    /// the frame succeeded. Fatal errors propagate without a revert.
    fn settle(
        &mut self,
        snapshot: usize,
        result: VmResult<Halt>,
        gas_left: u64,
    ) -> VmResult<CallOutput> {
        match result {
            Ok(Halt::Return(output)) => Ok(CallOutput::success(output, gas_left)),
            Ok(Halt::Revert(output)) => {
                self.state.revert_to_snapshot(snapshot)?;
                Ok(CallOutput {
                    status: CallStatus::Reverted,
                    output,
                    gas_left,
                    address: None,
                })
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::debug!(depth = self.depth, error = %e, "frame failed");
                self.state.revert_to_snapshot(snapshot)?;
                Ok(CallOutput {
                    status: CallStatus::Failed(e),
                    output: Vec::new(),
                    gas_left: 0,
                    address: None,
                })
            }
        }
    }

    // ==================== Calls ====================

    /// Message call: transfer `value` and run the code at `to`
    pub fn call(
        &mut self,
        caller: Address,
        to: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> VmResult<CallOutput> {
        tracing::debug!(depth = self.depth, %caller, %to, gas, %value, "call");
        if self.depth_exceeded() {
            return Ok(CallOutput::rejected(VmError::CallDepthExceeded, gas));
        }
        if !self.can_transfer(&caller, value)? {
            return Ok(CallOutput::rejected(VmError::InsufficientBalance, gas));
        }

        let snapshot = self.state.snapshot();
        if !self.state.exist(&to)? {
            if self.schedule.empty_is_absent && value.is_zero() {
                return Ok(CallOutput::success(Vec::new(), gas));
            }
            self.state.create_account(to)?;
        }
        self.transfer(&caller, &to, value)?;

        let code = self.state.get_code(&to)?;
        if code.is_empty() {
            return Ok(CallOutput::success(Vec::new(), gas));
        }
        let contract = Contract::new(caller, to, value, input, gas).with_code(to, code);
        let (result, gas_left) = self.run_frame(contract, false);
        self.settle(snapshot, result, gas_left)
    }

    /// Run the code at `to` against the caller's own account
    pub fn call_code(
        &mut self,
        caller: Address,
        to: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> VmResult<CallOutput> {
        tracing::debug!(depth = self.depth, %caller, %to, gas, "callcode");
        if self.depth_exceeded() {
            return Ok(CallOutput::rejected(VmError::CallDepthExceeded, gas));
        }
        if !self.can_transfer(&caller, value)? {
            return Ok(CallOutput::rejected(VmError::InsufficientBalance, gas));
        }

        let snapshot = self.state.snapshot();
        let code = self.state.get_code(&to)?;
        if code.is_empty() {
            return Ok(CallOutput::success(Vec::new(), gas));
        }
        let contract = Contract::new(caller, caller, value, input, gas).with_code(to, code);
        let (result, gas_left) = self.run_frame(contract, false);
        self.settle(snapshot, result, gas_left)
    }

    /// Run the code at `code_address` in the context of the current frame,
    /// keeping its caller and value
    pub fn delegate_call(
        &mut self,
        caller: Address,
        address: Address,
        code_address: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> VmResult<CallOutput> {
        tracing::debug!(depth = self.depth, %address, %code_address, gas, "delegatecall");
        if self.depth_exceeded() {
            return Ok(CallOutput::rejected(VmError::CallDepthExceeded, gas));
        }

        let snapshot = self.state.snapshot();
        let code = self.state.get_code(&code_address)?;
        if code.is_empty() {
            return Ok(CallOutput::success(Vec::new(), gas));
        }
        let contract =
            Contract::new(caller, address, value, input, gas).with_code(code_address, code);
        let (result, gas_left) = self.run_frame(contract, false);
        self.settle(snapshot, result, gas_left)
    }

    /// Call that may not modify state, at any depth below it
    pub fn static_call(
        &mut self,
        caller: Address,
        to: Address,
        input: Vec<u8>,
        gas: u64,
    ) -> VmResult<CallOutput> {
        tracing::debug!(depth = self.depth, %caller, %to, gas, "staticcall");
        if self.depth_exceeded() {
            return Ok(CallOutput::rejected(VmError::CallDepthExceeded, gas));
        }

        let snapshot = self.state.snapshot();
        let code = self.state.get_code(&to)?;
        if code.is_empty() {
            return Ok(CallOutput::success(Vec::new(), gas));
        }
        let contract = Contract::new(caller, to, U256::zero(), input, gas).with_code(to, code);
        let (result, gas_left) = self.run_frame(contract, true);
        self.settle(snapshot, result, gas_left)
    }

    // ==================== Creation ====================

    /// Deploy a contract at the address derived from the caller's nonce
    pub fn create(
        &mut self,
        caller: Address,
        init_code: Vec<u8>,
        gas: u64,
        value: U256,
    ) -> VmResult<CallOutput> {
        let address = create_address(&caller, self.state.get_nonce(&caller)?);
        self.create_at(caller, init_code, gas, value, address)
    }

    /// Deploy a contract at the address derived from caller, salt and code
    pub fn create2(
        &mut self,
        caller: Address,
        init_code: Vec<u8>,
        gas: u64,
        value: U256,
        salt: H256,
    ) -> VmResult<CallOutput> {
        let address = create2_address(&caller, &salt, &init_code);
        self.create_at(caller, init_code, gas, value, address)
    }

    fn create_at(
        &mut self,
        caller: Address,
        init_code: Vec<u8>,
        gas: u64,
        value: U256,
        address: Address,
    ) -> VmResult<CallOutput> {
        tracing::debug!(depth = self.depth, %caller, %address, gas, "create");
        if self.depth_exceeded() {
            return Ok(CallOutput::rejected(VmError::CallDepthExceeded, gas));
        }
        if !self.can_transfer(&caller, value)? {
            return Ok(CallOutput::rejected(VmError::InsufficientBalance, gas));
        }
        let nonce = self.state.get_nonce(&caller)?;
        self.state.set_nonce(&caller, nonce.saturating_add(1))?;

        let code_hash = self.state.get_code_hash(&address)?;
        let has_code = !(code_hash == H256::ZERO || code_hash == EMPTY_CODE_HASH);
        if self.state.get_nonce(&address)? != 0 || has_code {
            return Ok(CallOutput::rejected(VmError::ContractAddressCollision, gas));
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(address)?;
        if self.schedule.new_contract_nonce > 0 {
            self.state.set_nonce(&address, self.schedule.new_contract_nonce)?;
        }
        self.transfer(&caller, &address, value)?;

        let contract =
            Contract::new(caller, address, value, Vec::new(), gas).with_code(address, init_code);
        let (result, mut gas_left) = self.run_frame(contract, false);
        let result = match result {
            Ok(Halt::Return(code)) => self.deposit_code(&address, code, &mut gas_left),
            other => other,
        };

        let mut out = self.settle(snapshot, result, gas_left)?;
        if out.is_success() {
            out.address = Some(address);
        }
        Ok(out)
    }

    /// Store the runtime code returned by init code, charging per byte
    fn deposit_code(
        &mut self,
        address: &Address,
        code: Vec<u8>,
        gas_left: &mut u64,
    ) -> VmResult<Halt> {
        if self.schedule.limit_code_size && code.len() > self.params.max_code_size {
            return Err(VmError::MaxCodeSizeExceeded);
        }
        let cost = (code.len() as u64).saturating_mul(cost::CREATE_DATA);
        if *gas_left < cost {
            return Err(VmError::CodeStoreOutOfGas);
        }
        *gas_left -= cost;
        self.state.set_code(address, code.clone())?;
        Ok(Halt::Return(code))
    }
}
