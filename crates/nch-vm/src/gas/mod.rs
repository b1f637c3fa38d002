//! Gas cost calculations

mod dynamic;
mod schedule;

pub(crate) use dynamic::*;
pub use schedule::{GasSchedule, ProtocolVersion, SstoreScheme};

use crate::error::{VmError, VmResult};
use crate::memory::Memory;
use crate::word::to_word_size;

/// Gas costs shared by every protocol version
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;
    /// External account access
    pub const EXT: u64 = 20;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp base gas
    pub const EXP: u64 = 10;
    /// Keccak256 base gas
    pub const SHA3: u64 = 30;
    /// Keccak256 gas per word
    pub const SHA3_WORD: u64 = 6;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Divisor of the quadratic memory term
    pub const QUAD_COEFF_DIV: u64 = 512;
    /// Largest memory size whose cost fits the gas arithmetic
    pub const MAX_MEMORY_SIZE: u64 = 0x1F_FFFF_FFE0;

    /// Sstore zero to non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore other writes
    pub const SSTORE_RESET: u64 = 5000;
    /// Refund for clearing a slot
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;
    /// Net-metered no-op or dirty write
    pub const SSTORE_DIRTY: u64 = 800;
    /// Net-metered SSTORE fails when no more than this is left
    pub const SSTORE_SENTRY: u64 = 2300;
    /// Refund for restoring a slot that was originally zero
    pub const SSTORE_RESET_CLEAR_REFUND: u64 = 19200;
    /// Refund for restoring a slot that was originally non-zero
    pub const SSTORE_RESET_REFUND: u64 = 4200;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Create2 gas
    pub const CREATE2: u64 = 32000;
    /// Code deposit gas per byte
    pub const CREATE_DATA: u64 = 200;
    /// Value transfer surcharge on calls
    pub const CALL_VALUE: u64 = 9000;
    /// Surcharge for bringing a new account into existence
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Gas handed to the callee for free on value transfers
    pub const CALL_STIPEND: u64 = 2300;
    /// Selfdestruct base gas
    pub const SELFDESTRUCT: u64 = 5000;
    /// Refund for the first selfdestruct of an account
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Intrinsic gas of a call transaction
    pub const TX: u64 = 21000;
    /// Intrinsic gas of a creation transaction
    pub const TX_CREATE: u64 = 53000;
    /// Intrinsic gas per zero byte of data
    pub const TX_DATA_ZERO: u64 = 4;
}

/// Incremental gas for growing `memory` to `new_size` bytes.
///
/// Charges `words * 3 + words² / 512` minus what was already billed, and
/// records the new total on the memory. Nothing is charged when the memory is
/// already at least that large.
pub fn memory_gas_cost(memory: &mut Memory, new_size: u64) -> VmResult<u64> {
    if new_size == 0 {
        return Ok(0);
    }
    if new_size > cost::MAX_MEMORY_SIZE {
        return Err(VmError::GasUintOverflow);
    }
    let words = to_word_size(new_size);
    if words * 32 <= memory.len() as u64 {
        return Ok(0);
    }
    let linear = words * cost::MEMORY;
    let quadratic = words * words / cost::QUAD_COEFF_DIV;
    let total = linear + quadratic;
    let fee = total - memory.last_gas_cost();
    memory.set_last_gas_cost(total);
    Ok(fee)
}

/// Gas forwarded to a sub-call: all but one 64th of what is left after
/// `base`, capped by the requested amount.
pub fn call_gas(available: u64, base: u64, requested: u64) -> VmResult<u64> {
    let left = available.checked_sub(base).ok_or(VmError::OutOfGas)?;
    let max = left - left / 64;
    Ok(requested.min(max))
}

/// Gas paid before any code runs
pub fn intrinsic_gas(data: &[u8], is_create: bool, schedule: &GasSchedule) -> VmResult<u64> {
    let mut gas = if is_create { cost::TX_CREATE } else { cost::TX };
    let non_zero = data.iter().filter(|b| **b != 0).count() as u64;
    let zero = data.len() as u64 - non_zero;

    let non_zero_gas = non_zero
        .checked_mul(schedule.tx_data_non_zero)
        .ok_or(VmError::GasUintOverflow)?;
    gas = gas.checked_add(non_zero_gas).ok_or(VmError::GasUintOverflow)?;
    let zero_gas = zero
        .checked_mul(cost::TX_DATA_ZERO)
        .ok_or(VmError::GasUintOverflow)?;
    gas.checked_add(zero_gas).ok_or(VmError::GasUintOverflow)
}
