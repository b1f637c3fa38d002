//! Per-opcode dispatch table

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::gas::{self, cost, GasSchedule};
use crate::instructions::{arithmetic, bitwise, environment, flow, logging, system};
use crate::interpreter::Frame;
use crate::opcode::OpCode;
use crate::stack::{Stack, STACK_LIMIT};
use crate::word::{self, Word};

/// Instruction implementation; returns the instruction's output bytes
pub type ExecuteFn = fn(&mut Frame, &mut Evm<'_>) -> VmResult<Vec<u8>>;
/// Operand-dependent gas, given the word-aligned memory size the op needs
pub type DynamicGasFn = fn(&mut Evm<'_>, &mut Frame, u64) -> VmResult<u64>;
/// Memory size an op needs, or `GasUintOverflow` if it does not fit 64 bits
pub type MemorySizeFn = fn(&Stack) -> VmResult<u64>;

/// Everything the interpreter needs to know about one opcode
#[derive(Clone, Copy)]
pub struct Operation {
    /// Implementation
    pub execute: ExecuteFn,
    /// Gas charged before anything else
    pub constant_gas: u64,
    /// Gas depending on operands
    pub dynamic_gas: Option<DynamicGasFn>,
    /// Memory the op touches
    pub memory_size: Option<MemorySizeFn>,
    /// Items required on the stack
    pub min_stack: usize,
    /// Largest stack depth that leaves room for the op's pushes
    pub max_stack: usize,
    /// Ends the frame successfully
    pub halts: bool,
    /// Sets the program counter itself
    pub jumps: bool,
    /// Modifies state; forbidden in a static context
    pub writes: bool,
    /// Output replaces the frame's return data buffer
    pub returns: bool,
    /// Ends the frame with a revert
    pub reverts: bool,
    /// Defined in this protocol version
    pub valid: bool,
}

impl Operation {
    fn new(execute: ExecuteFn, constant_gas: u64, pops: usize, pushes: usize) -> Self {
        Self {
            execute,
            constant_gas,
            dynamic_gas: None,
            memory_size: None,
            min_stack: pops,
            max_stack: STACK_LIMIT + pops - pushes,
            halts: false,
            jumps: false,
            writes: false,
            returns: false,
            reverts: false,
            valid: true,
        }
    }

    fn undefined() -> Self {
        Self {
            valid: false,
            ..Self::new(undefined, 0, 0, 0)
        }
    }

    fn dynamic(mut self, f: DynamicGasFn) -> Self {
        self.dynamic_gas = Some(f);
        self
    }

    fn memory(mut self, f: MemorySizeFn) -> Self {
        self.memory_size = Some(f);
        self
    }

    fn halts(mut self) -> Self {
        self.halts = true;
        self
    }

    fn jumps(mut self) -> Self {
        self.jumps = true;
        self
    }

    fn writes(mut self) -> Self {
        self.writes = true;
        self
    }

    fn returns(mut self) -> Self {
        self.returns = true;
        self
    }

    fn reverts(mut self) -> Self {
        self.reverts = true;
        self
    }
}

fn undefined(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    Err(VmError::InvalidOpcode(frame.contract.op(frame.pc).0))
}

// ==================== Memory sizes ====================

/// End of the memory range `[offset, offset + length)`; zero for an empty range
fn calc_mem_size(offset: &Word, length: &Word) -> VmResult<u64> {
    if length.is_zero() {
        return Ok(0);
    }
    let offset = word::checked_u64(offset).ok_or(VmError::GasUintOverflow)?;
    let length = word::checked_u64(length).ok_or(VmError::GasUintOverflow)?;
    offset.checked_add(length).ok_or(VmError::GasUintOverflow)
}

fn range(stack: &Stack, offset: usize, length: usize) -> VmResult<u64> {
    calc_mem_size(stack.back(offset)?, stack.back(length)?)
}

fn memory_mload(stack: &Stack) -> VmResult<u64> {
    calc_mem_size(stack.back(0)?, &Word::from(32u64))
}

fn memory_mstore8(stack: &Stack) -> VmResult<u64> {
    calc_mem_size(stack.back(0)?, &Word::one())
}

/// KECCAK256, LOGn, RETURN, REVERT
fn memory_offset_size(stack: &Stack) -> VmResult<u64> {
    range(stack, 0, 1)
}

/// CALLDATACOPY, CODECOPY, RETURNDATACOPY
fn memory_copy(stack: &Stack) -> VmResult<u64> {
    range(stack, 0, 2)
}

fn memory_ext_code_copy(stack: &Stack) -> VmResult<u64> {
    range(stack, 1, 3)
}

/// CREATE, CREATE2
fn memory_create(stack: &Stack) -> VmResult<u64> {
    range(stack, 1, 2)
}

/// CALL, CALLCODE
fn memory_call(stack: &Stack) -> VmResult<u64> {
    Ok(range(stack, 3, 4)?.max(range(stack, 5, 6)?))
}

/// DELEGATECALL, STATICCALL
fn memory_call_no_value(stack: &Stack) -> VmResult<u64> {
    Ok(range(stack, 2, 3)?.max(range(stack, 4, 5)?))
}

// ==================== Table ====================

/// Dispatch table for one protocol version
pub struct JumpTable {
    ops: [Operation; 256],
}

impl JumpTable {
    /// Build the table for a gas schedule
    pub fn new(schedule: &GasSchedule) -> Self {
        use OpCode as Op;

        let mut ops = [Operation::undefined(); 256];
        let mut set = |op: OpCode, operation: Operation| ops[op.0 as usize] = operation;

        // Stop and arithmetic
        set(Op::STOP, Operation::new(flow::stop, cost::ZERO, 0, 0).halts());
        set(Op::ADD, Operation::new(arithmetic::add, cost::VERYLOW, 2, 1));
        set(Op::MUL, Operation::new(arithmetic::mul, cost::LOW, 2, 1));
        set(Op::SUB, Operation::new(arithmetic::sub, cost::VERYLOW, 2, 1));
        set(Op::DIV, Operation::new(arithmetic::div, cost::LOW, 2, 1));
        set(Op::SDIV, Operation::new(arithmetic::sdiv, cost::LOW, 2, 1));
        set(Op::MOD, Operation::new(arithmetic::rem, cost::LOW, 2, 1));
        set(Op::SMOD, Operation::new(arithmetic::smod, cost::LOW, 2, 1));
        set(Op::ADDMOD, Operation::new(arithmetic::addmod, cost::MID, 3, 1));
        set(Op::MULMOD, Operation::new(arithmetic::mulmod, cost::MID, 3, 1));
        set(Op::EXP, Operation::new(arithmetic::exp, cost::ZERO, 2, 1).dynamic(gas::gas_exp));
        set(Op::SIGNEXTEND, Operation::new(arithmetic::signextend, cost::LOW, 2, 1));

        // Comparison and bitwise logic
        set(Op::LT, Operation::new(bitwise::lt, cost::VERYLOW, 2, 1));
        set(Op::GT, Operation::new(bitwise::gt, cost::VERYLOW, 2, 1));
        set(Op::SLT, Operation::new(bitwise::slt, cost::VERYLOW, 2, 1));
        set(Op::SGT, Operation::new(bitwise::sgt, cost::VERYLOW, 2, 1));
        set(Op::EQ, Operation::new(bitwise::eq, cost::VERYLOW, 2, 1));
        set(Op::ISZERO, Operation::new(bitwise::iszero, cost::VERYLOW, 1, 1));
        set(Op::AND, Operation::new(bitwise::and, cost::VERYLOW, 2, 1));
        set(Op::OR, Operation::new(bitwise::or, cost::VERYLOW, 2, 1));
        set(Op::XOR, Operation::new(bitwise::xor, cost::VERYLOW, 2, 1));
        set(Op::NOT, Operation::new(bitwise::not, cost::VERYLOW, 1, 1));
        set(Op::BYTE, Operation::new(bitwise::byte, cost::VERYLOW, 2, 1));
        set(Op::SHL, Operation::new(bitwise::shl, cost::VERYLOW, 2, 1));
        set(Op::SHR, Operation::new(bitwise::shr, cost::VERYLOW, 2, 1));
        set(Op::SAR, Operation::new(bitwise::sar, cost::VERYLOW, 2, 1));

        set(
            Op::KECCAK256,
            Operation::new(environment::keccak256, cost::SHA3, 2, 1)
                .dynamic(gas::gas_keccak256)
                .memory(memory_offset_size),
        );

        // Environment
        set(Op::ADDRESS, Operation::new(environment::address, cost::BASE, 0, 1));
        set(Op::BALANCE, Operation::new(environment::balance, schedule.balance, 1, 1));
        set(Op::ORIGIN, Operation::new(environment::origin, cost::BASE, 0, 1));
        set(Op::CALLER, Operation::new(environment::caller, cost::BASE, 0, 1));
        set(Op::CALLVALUE, Operation::new(environment::call_value, cost::BASE, 0, 1));
        set(Op::CALLDATALOAD, Operation::new(environment::call_data_load, cost::VERYLOW, 1, 1));
        set(Op::CALLDATASIZE, Operation::new(environment::call_data_size, cost::BASE, 0, 1));
        set(
            Op::CALLDATACOPY,
            Operation::new(environment::call_data_copy, cost::VERYLOW, 3, 0)
                .dynamic(gas::gas_copy)
                .memory(memory_copy),
        );
        set(Op::CODESIZE, Operation::new(environment::code_size, cost::BASE, 0, 1));
        set(
            Op::CODECOPY,
            Operation::new(environment::code_copy, cost::VERYLOW, 3, 0)
                .dynamic(gas::gas_copy)
                .memory(memory_copy),
        );
        set(Op::GASPRICE, Operation::new(environment::gas_price, cost::BASE, 0, 1));
        set(
            Op::EXTCODESIZE,
            Operation::new(environment::ext_code_size, schedule.ext_code_size, 1, 1),
        );
        set(
            Op::EXTCODECOPY,
            Operation::new(environment::ext_code_copy, schedule.ext_code_copy, 4, 0)
                .dynamic(gas::gas_ext_code_copy)
                .memory(memory_ext_code_copy),
        );
        set(Op::RETURNDATASIZE, Operation::new(environment::return_data_size, cost::BASE, 0, 1));
        set(
            Op::RETURNDATACOPY,
            Operation::new(environment::return_data_copy, cost::VERYLOW, 3, 0)
                .dynamic(gas::gas_copy)
                .memory(memory_copy),
        );
        set(
            Op::EXTCODEHASH,
            Operation::new(environment::ext_code_hash, schedule.ext_code_hash, 1, 1),
        );

        // Block
        set(Op::BLOCKHASH, Operation::new(environment::block_hash, cost::EXT, 1, 1));
        set(Op::COINBASE, Operation::new(environment::coinbase, cost::BASE, 0, 1));
        set(Op::TIMESTAMP, Operation::new(environment::timestamp, cost::BASE, 0, 1));
        set(Op::NUMBER, Operation::new(environment::number, cost::BASE, 0, 1));
        set(Op::DIFFICULTY, Operation::new(environment::difficulty, cost::BASE, 0, 1));
        set(Op::GASLIMIT, Operation::new(environment::gas_limit, cost::BASE, 0, 1));
        if schedule.chain_id_opcodes {
            set(Op::CHAINID, Operation::new(environment::chain_id, cost::BASE, 0, 1));
            set(Op::SELFBALANCE, Operation::new(environment::self_balance, cost::LOW, 0, 1));
        }

        // Stack, memory, storage and flow
        set(Op::POP, Operation::new(flow::pop, cost::BASE, 1, 0));
        set(
            Op::MLOAD,
            Operation::new(flow::mload, cost::VERYLOW, 1, 1)
                .dynamic(gas::gas_memory)
                .memory(memory_mload),
        );
        set(
            Op::MSTORE,
            Operation::new(flow::mstore, cost::VERYLOW, 2, 0)
                .dynamic(gas::gas_memory)
                .memory(memory_mload),
        );
        set(
            Op::MSTORE8,
            Operation::new(flow::mstore8, cost::VERYLOW, 2, 0)
                .dynamic(gas::gas_memory)
                .memory(memory_mstore8),
        );
        set(Op::SLOAD, Operation::new(flow::sload, schedule.sload, 1, 1));
        set(
            Op::SSTORE,
            Operation::new(flow::sstore, cost::ZERO, 2, 0)
                .dynamic(gas::gas_sstore)
                .writes(),
        );
        set(Op::JUMP, Operation::new(flow::jump, cost::MID, 1, 0).jumps());
        set(Op::JUMPI, Operation::new(flow::jumpi, cost::HIGH, 2, 0).jumps());
        set(Op::PC, Operation::new(flow::pc, cost::BASE, 0, 1));
        set(Op::MSIZE, Operation::new(flow::msize, cost::BASE, 0, 1));
        set(Op::GAS, Operation::new(flow::gas, cost::BASE, 0, 1));
        set(Op::JUMPDEST, Operation::new(flow::jumpdest, cost::JUMPDEST, 0, 0));

        for n in 1..=32u8 {
            set(OpCode(0x5f + n), Operation::new(flow::push, cost::VERYLOW, 0, 1));
        }
        for n in 1..=16usize {
            set(OpCode(0x7f + n as u8), Operation::new(flow::dup, cost::VERYLOW, n, n + 1));
            set(OpCode(0x8f + n as u8), Operation::new(flow::swap, cost::VERYLOW, n + 1, n + 1));
        }

        // Logging
        let log_gas: [DynamicGasFn; 5] = [
            gas::gas_log::<0>,
            gas::gas_log::<1>,
            gas::gas_log::<2>,
            gas::gas_log::<3>,
            gas::gas_log::<4>,
        ];
        for (topics, gas_fn) in log_gas.into_iter().enumerate() {
            set(
                OpCode(OpCode::LOG0.0 + topics as u8),
                Operation::new(logging::log, cost::ZERO, 2 + topics, 0)
                    .dynamic(gas_fn)
                    .memory(memory_offset_size)
                    .writes(),
            );
        }

        // System
        set(
            Op::CREATE,
            Operation::new(system::create, cost::CREATE, 3, 1)
                .dynamic(gas::gas_memory)
                .memory(memory_create)
                .writes()
                .returns(),
        );
        set(
            Op::CALL,
            Operation::new(system::call, schedule.call, 7, 1)
                .dynamic(gas::gas_call)
                .memory(memory_call)
                .returns(),
        );
        set(
            Op::CALLCODE,
            Operation::new(system::call_code, schedule.call, 7, 1)
                .dynamic(gas::gas_call_code)
                .memory(memory_call)
                .returns(),
        );
        set(
            Op::RETURN,
            Operation::new(system::ret, cost::ZERO, 2, 0)
                .dynamic(gas::gas_memory)
                .memory(memory_offset_size)
                .halts(),
        );
        set(
            Op::DELEGATECALL,
            Operation::new(system::delegate_call, schedule.call, 6, 1)
                .dynamic(gas::gas_call_no_value)
                .memory(memory_call_no_value)
                .returns(),
        );
        set(
            Op::CREATE2,
            Operation::new(system::create2, cost::CREATE2, 4, 1)
                .dynamic(gas::gas_create2)
                .memory(memory_create)
                .writes()
                .returns(),
        );
        set(
            Op::STATICCALL,
            Operation::new(system::static_call, schedule.call, 6, 1)
                .dynamic(gas::gas_call_no_value)
                .memory(memory_call_no_value)
                .returns(),
        );
        set(
            Op::REVERT,
            Operation::new(system::revert, cost::ZERO, 2, 0)
                .dynamic(gas::gas_memory)
                .memory(memory_offset_size)
                .reverts()
                .returns(),
        );
        set(
            Op::SELFDESTRUCT,
            Operation::new(system::selfdestruct, schedule.self_destruct, 1, 0)
                .dynamic(gas::gas_selfdestruct)
                .halts()
                .writes(),
        );

        Self { ops }
    }

    /// Operation for an opcode
    pub fn get(&self, op: OpCode) -> &Operation {
        &self.ops[op.0 as usize]
    }
}
