//! Operand-dependent gas of individual instructions

use nch_primitives::H256;

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::gas::{call_gas, cost, memory_gas_cost, SstoreScheme};
use crate::interpreter::Frame;
use crate::word::{self, to_word_size, Word};

fn add(a: u64, b: u64) -> VmResult<u64> {
    a.checked_add(b).ok_or(VmError::GasUintOverflow)
}

/// `per_word` for every 32-byte word of a byte length held on the stack
fn per_word(length: &Word, per_word: u64) -> VmResult<u64> {
    let length = word::checked_u64(length).ok_or(VmError::GasUintOverflow)?;
    to_word_size(length)
        .checked_mul(per_word)
        .ok_or(VmError::GasUintOverflow)
}

pub(crate) fn gas_memory(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    memory_gas_cost(&mut frame.memory, memory_size)
}

fn copy_gas(frame: &mut Frame, memory_size: u64, length_pos: usize) -> VmResult<u64> {
    let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    let words = per_word(frame.stack.back(length_pos)?, cost::COPY)?;
    add(gas, words)
}

/// CALLDATACOPY, CODECOPY, RETURNDATACOPY
pub(crate) fn gas_copy(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    copy_gas(frame, memory_size, 2)
}

pub(crate) fn gas_ext_code_copy(
    _evm: &mut Evm<'_>,
    frame: &mut Frame,
    memory_size: u64,
) -> VmResult<u64> {
    copy_gas(frame, memory_size, 3)
}

pub(crate) fn gas_keccak256(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    add(gas, per_word(frame.stack.back(1)?, cost::SHA3_WORD)?)
}

pub(crate) fn gas_exp(evm: &mut Evm<'_>, frame: &mut Frame, _memory_size: u64) -> VmResult<u64> {
    let exponent_bytes = (frame.stack.back(1)?.bits() as u64 + 7) / 8;
    let gas = exponent_bytes
        .checked_mul(evm.schedule.exp_byte)
        .ok_or(VmError::GasUintOverflow)?;
    add(gas, cost::EXP)
}

pub(crate) fn gas_log<const TOPICS: u64>(
    _evm: &mut Evm<'_>,
    frame: &mut Frame,
    memory_size: u64,
) -> VmResult<u64> {
    let requested = word::checked_u64(frame.stack.back(1)?).ok_or(VmError::GasUintOverflow)?;
    let mut gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    gas = add(gas, cost::LOG)?;
    gas = add(gas, TOPICS * cost::LOG_TOPIC)?;
    let data = requested
        .checked_mul(cost::LOG_DATA)
        .ok_or(VmError::GasUintOverflow)?;
    add(gas, data)
}

/// SSTORE, including the refund bookkeeping of the active scheme
pub(crate) fn gas_sstore(evm: &mut Evm<'_>, frame: &mut Frame, _memory_size: u64) -> VmResult<u64> {
    let address = frame.contract.address;
    let key = word::to_h256(frame.stack.back(0)?);
    let value = word::to_h256(frame.stack.back(1)?);

    match evm.schedule.sstore {
        SstoreScheme::Legacy => {
            let current = evm.state.get_state(&address, &key)?;
            if current.is_zero() && !value.is_zero() {
                Ok(cost::SSTORE_SET)
            } else if !current.is_zero() && value.is_zero() {
                evm.state.add_refund(cost::SSTORE_CLEAR_REFUND);
                Ok(cost::SSTORE_RESET)
            } else {
                Ok(cost::SSTORE_RESET)
            }
        }
        SstoreScheme::NetMetered => {
            if frame.contract.gas <= cost::SSTORE_SENTRY {
                return Err(VmError::OutOfGas);
            }
            let current = evm.state.get_state(&address, &key)?;
            if current == value {
                return Ok(cost::SSTORE_DIRTY);
            }
            let original = evm.state.get_committed_state(&address, &key)?;
            if original == current {
                if original.is_zero() {
                    return Ok(cost::SSTORE_SET);
                }
                if value.is_zero() {
                    evm.state.add_refund(cost::SSTORE_CLEAR_REFUND);
                }
                return Ok(cost::SSTORE_RESET);
            }
            dirty_slot_refunds(evm, &original, &current, &value)?;
            Ok(cost::SSTORE_DIRTY)
        }
    }
}

fn dirty_slot_refunds(evm: &mut Evm<'_>, original: &H256, current: &H256, value: &H256) -> VmResult<()> {
    if !original.is_zero() {
        if current.is_zero() {
            evm.state.sub_refund(cost::SSTORE_CLEAR_REFUND)?;
        } else if value.is_zero() {
            evm.state.add_refund(cost::SSTORE_CLEAR_REFUND);
        }
    }
    if original == value {
        if original.is_zero() {
            evm.state.add_refund(cost::SSTORE_RESET_CLEAR_REFUND);
        } else {
            evm.state.add_refund(cost::SSTORE_RESET_REFUND);
        }
    }
    Ok(())
}

/// Forwarded gas for the pending call, stashed on the machine for the handler
fn reserve_call_gas(evm: &mut Evm<'_>, frame: &Frame, gas: u64) -> VmResult<u64> {
    let requested = word::checked_u64(frame.stack.back(0)?).unwrap_or(u64::MAX);
    evm.call_gas_temp = call_gas(frame.contract.gas, gas, requested)?;
    add(gas, evm.call_gas_temp)
}

pub(crate) fn gas_call(evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    let transfers_value = !frame.stack.back(2)?.is_zero();
    let target = word::to_address(frame.stack.back(1)?);

    let mut gas = 0;
    if evm.schedule.empty_is_absent {
        if transfers_value && evm.state.empty(&target)? {
            gas += cost::CALL_NEW_ACCOUNT;
        }
    } else if !evm.state.exist(&target)? {
        gas += cost::CALL_NEW_ACCOUNT;
    }
    if transfers_value {
        gas += cost::CALL_VALUE;
    }
    gas = add(gas, memory_gas_cost(&mut frame.memory, memory_size)?)?;
    reserve_call_gas(evm, frame, gas)
}

pub(crate) fn gas_call_code(evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    let mut gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    if !frame.stack.back(2)?.is_zero() {
        gas = add(gas, cost::CALL_VALUE)?;
    }
    reserve_call_gas(evm, frame, gas)
}

/// DELEGATECALL and STATICCALL
pub(crate) fn gas_call_no_value(
    evm: &mut Evm<'_>,
    frame: &mut Frame,
    memory_size: u64,
) -> VmResult<u64> {
    let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    reserve_call_gas(evm, frame, gas)
}

pub(crate) fn gas_create2(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> VmResult<u64> {
    let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
    add(gas, per_word(frame.stack.back(2)?, cost::SHA3_WORD)?)
}

pub(crate) fn gas_selfdestruct(
    evm: &mut Evm<'_>,
    frame: &mut Frame,
    _memory_size: u64,
) -> VmResult<u64> {
    let address = frame.contract.address;
    let beneficiary = word::to_address(frame.stack.back(0)?);

    let mut gas = 0;
    if evm.schedule.empty_is_absent {
        if evm.state.empty(&beneficiary)? && !evm.state.get_balance(&address)?.is_zero() {
            gas += cost::CALL_NEW_ACCOUNT;
        }
    } else if !evm.state.exist(&beneficiary)? {
        gas += cost::CALL_NEW_ACCOUNT;
    }
    if !evm.state.has_suicided(&address)? {
        evm.state.add_refund(cost::SELFDESTRUCT_REFUND);
    }
    Ok(gas)
}
