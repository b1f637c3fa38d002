//! Bytecode interpreter loop

use nch_primitives::{Address, U256};

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::memory::Memory;
use crate::opcode::OpCode;
use crate::stack::Stack;
use crate::word::{self, to_word_size, Word, WORD_SIZE};

/// Code being executed together with its call parameters and gas
#[derive(Clone, Debug)]
pub struct Contract {
    /// Account that initiated the frame
    pub caller: Address,
    /// Account whose storage and balance the frame acts on
    pub address: Address,
    /// Account the code was loaded from
    pub code_address: Address,
    /// Value passed with the call
    pub value: Word,
    /// Call data
    pub input: Vec<u8>,
    /// Bytecode
    pub code: Vec<u8>,
    /// Gas remaining
    pub gas: u64,
    jump_dests: Vec<bool>,
}

impl Contract {
    /// Frame without code; attach some with [`Contract::with_code`]
    pub fn new(caller: Address, address: Address, value: U256, input: Vec<u8>, gas: u64) -> Self {
        Self {
            caller,
            address,
            code_address: address,
            value,
            input,
            code: Vec::new(),
            gas,
            jump_dests: Vec::new(),
        }
    }

    /// Attach the code found at `code_address`
    pub fn with_code(mut self, code_address: Address, code: Vec<u8>) -> Self {
        self.jump_dests = analyze_jump_dests(&code);
        self.code_address = code_address;
        self.code = code;
        self
    }

    /// Opcode at `pc`; STOP past the end of the code
    pub fn op(&self, pc: usize) -> OpCode {
        OpCode(self.code.get(pc).copied().unwrap_or(OpCode::STOP.0))
    }

    /// Deduct gas; false if not enough is left
    pub fn use_gas(&mut self, amount: u64) -> bool {
        if self.gas < amount {
            return false;
        }
        self.gas -= amount;
        true
    }

    /// Destination is a JUMPDEST opcode, not PUSH data
    pub fn valid_jump_dest(&self, dest: &Word) -> bool {
        match word::checked_u64(dest).and_then(|d| usize::try_from(d).ok()) {
            Some(d) => self.jump_dests.get(d).copied().unwrap_or(false),
            None => false,
        }
    }
}

/// Mark the JUMPDEST bytes that are not inside PUSH immediates
fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        let op = OpCode(code[i]);
        if op == OpCode::JUMPDEST {
            dests[i] = true;
        }
        // Skip PUSH operands
        i += 1 + op.push_size();
    }
    dests
}

/// Execution state of one call frame
#[derive(Debug)]
pub struct Frame {
    /// Code and gas
    pub contract: Contract,
    /// Operand stack
    pub stack: Stack,
    /// Memory
    pub memory: Memory,
    /// Program counter
    pub pc: usize,
    /// Output of the most recent sub-call
    pub return_data: Vec<u8>,
}

impl Frame {
    /// Fresh frame for a contract
    pub fn new(contract: Contract) -> Self {
        Self {
            contract,
            stack: Stack::new(),
            memory: Memory::new(),
            pc: 0,
            return_data: Vec::new(),
        }
    }
}

/// How a frame finished without error
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Halt {
    /// STOP, RETURN, SELFDESTRUCT or end of code
    Return(Vec<u8>),
    /// REVERT with its reason
    Revert(Vec<u8>),
}

/// Run a frame to completion.
///
/// Each step checks, in order: opcode validity, stack bounds, static-context
/// writes, constant gas, memory size, dynamic gas; then grows memory and
/// executes.
pub fn run(evm: &mut Evm<'_>, frame: &mut Frame) -> VmResult<Halt> {
    if frame.contract.code.is_empty() {
        return Ok(Halt::Return(Vec::new()));
    }

    loop {
        let op = frame.contract.op(frame.pc);
        let operation = *evm.table().get(op);

        if !operation.valid {
            return Err(VmError::InvalidOpcode(op.0));
        }

        let depth = frame.stack.len();
        if depth < operation.min_stack {
            return Err(VmError::StackUnderflow);
        }
        if depth > operation.max_stack {
            return Err(VmError::StackOverflow);
        }

        if evm.read_only()
            && (operation.writes
                || (op == OpCode::CALL && !frame.stack.back(2)?.is_zero()))
        {
            return Err(VmError::WriteProtection);
        }

        if !frame.contract.use_gas(operation.constant_gas) {
            return Err(VmError::OutOfGas);
        }

        let mut memory_size = 0;
        if let Some(size_fn) = operation.memory_size {
            let size = size_fn(&frame.stack)?;
            memory_size = to_word_size(size)
                .checked_mul(WORD_SIZE)
                .ok_or(VmError::GasUintOverflow)?;
        }

        if let Some(gas_fn) = operation.dynamic_gas {
            let cost = gas_fn(evm, frame, memory_size)?;
            if !frame.contract.use_gas(cost) {
                return Err(VmError::OutOfGas);
            }
        }

        if memory_size > 0 {
            frame.memory.resize(memory_size);
        }

        tracing::trace!(
            pc = frame.pc,
            op = op.name().unwrap_or("?"),
            gas = frame.contract.gas,
            stack = frame.stack.len(),
            "step"
        );

        let output = (operation.execute)(frame, evm)?;

        if operation.returns {
            frame.return_data = output.clone();
        }
        if operation.reverts {
            return Ok(Halt::Revert(output));
        }
        if operation.halts {
            return Ok(Halt::Return(output));
        }
        if !operation.jumps {
            frame.pc += 1;
        }
    }
}
