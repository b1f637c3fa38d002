//! Calls, creation, halting and self-destruct

use crate::error::VmResult;
use crate::evm::{CallOutput, CallStatus, Evm};
use crate::gas::cost;
use crate::interpreter::Frame;
use crate::word::{self, from_bool, Word};

pub(crate) fn ret(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [offset, size] = frame.stack.pop_n::<2>()?;
    frame.memory.get_copy(offset.low_u64(), size.low_u64())
}

pub(crate) fn revert(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [offset, size] = frame.stack.pop_n::<2>()?;
    frame.memory.get_copy(offset.low_u64(), size.low_u64())
}

pub(crate) fn selfdestruct(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let beneficiary = word::to_address(&frame.stack.pop()?);
    let address = frame.contract.address;
    let balance = evm.state.get_balance(&address)?;
    evm.state.add_balance(&beneficiary, balance)?;
    evm.state.suicide(&address)?;
    Ok(Vec::new())
}

// ==================== Creation ====================

/// Push the new address on success, hand back unused gas, and keep the
/// output only when the init code reverted
fn finish_create(frame: &mut Frame, out: CallOutput) -> VmResult<Vec<u8>> {
    let pushed = match (&out.status, out.address) {
        (CallStatus::Success, Some(address)) => address.to_word(),
        _ => Word::zero(),
    };
    frame.stack.push(pushed)?;
    frame.contract.gas += out.gas_left;
    match out.status {
        CallStatus::Reverted => Ok(out.output),
        _ => Ok(Vec::new()),
    }
}

/// All but one 64th of the remaining gas goes to the init code
fn take_create_gas(frame: &mut Frame) -> u64 {
    let gas = frame.contract.gas - frame.contract.gas / 64;
    frame.contract.gas -= gas;
    gas
}

pub(crate) fn create(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [value, offset, size] = frame.stack.pop_n::<3>()?;
    let init_code = frame.memory.get_copy(offset.low_u64(), size.low_u64())?;
    let gas = take_create_gas(frame);
    let out = evm.create(frame.contract.address, init_code, gas, value)?;
    finish_create(frame, out)
}

pub(crate) fn create2(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [value, offset, size, salt] = frame.stack.pop_n::<4>()?;
    let init_code = frame.memory.get_copy(offset.low_u64(), size.low_u64())?;
    let gas = take_create_gas(frame);
    let out = evm.create2(frame.contract.address, init_code, gas, value, word::to_h256(&salt))?;
    finish_create(frame, out)
}

// ==================== Calls ====================

/// Push the success flag, copy the output into the caller's memory and
/// refund unused gas
fn finish_call(
    frame: &mut Frame,
    out: CallOutput,
    ret_offset: Word,
    ret_size: Word,
) -> VmResult<Vec<u8>> {
    frame.stack.push(from_bool(out.status == CallStatus::Success))?;
    if matches!(out.status, CallStatus::Success | CallStatus::Reverted) {
        frame
            .memory
            .set(ret_offset.low_u64(), ret_size.low_u64(), &out.output)?;
    }
    frame.contract.gas += out.gas_left;
    Ok(out.output)
}

pub(crate) fn call(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [_, to, value, in_offset, in_size, ret_offset, ret_size] = frame.stack.pop_n::<7>()?;
    let input = frame.memory.get_copy(in_offset.low_u64(), in_size.low_u64())?;
    let mut gas = evm.call_gas_temp;
    if !value.is_zero() {
        gas += cost::CALL_STIPEND;
    }
    let out = evm.call(frame.contract.address, word::to_address(&to), input, gas, value)?;
    finish_call(frame, out, ret_offset, ret_size)
}

pub(crate) fn call_code(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [_, to, value, in_offset, in_size, ret_offset, ret_size] = frame.stack.pop_n::<7>()?;
    let input = frame.memory.get_copy(in_offset.low_u64(), in_size.low_u64())?;
    let mut gas = evm.call_gas_temp;
    if !value.is_zero() {
        gas += cost::CALL_STIPEND;
    }
    let out = evm.call_code(frame.contract.address, word::to_address(&to), input, gas, value)?;
    finish_call(frame, out, ret_offset, ret_size)
}

pub(crate) fn delegate_call(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [_, to, in_offset, in_size, ret_offset, ret_size] = frame.stack.pop_n::<6>()?;
    let input = frame.memory.get_copy(in_offset.low_u64(), in_size.low_u64())?;
    let out = evm.delegate_call(
        frame.contract.caller,
        frame.contract.address,
        word::to_address(&to),
        input,
        evm.call_gas_temp,
        frame.contract.value,
    )?;
    finish_call(frame, out, ret_offset, ret_size)
}

pub(crate) fn static_call(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [_, to, in_offset, in_size, ret_offset, ret_size] = frame.stack.pop_n::<6>()?;
    let input = frame.memory.get_copy(in_offset.low_u64(), in_size.low_u64())?;
    let out = evm.static_call(
        frame.contract.address,
        word::to_address(&to),
        input,
        evm.call_gas_temp,
    )?;
    finish_call(frame, out, ret_offset, ret_size)
}
