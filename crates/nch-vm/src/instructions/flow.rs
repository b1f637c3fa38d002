//! Stack, memory, storage and control flow

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::interpreter::Frame;
use crate::word::{self, Word};

pub(crate) fn stop(_frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    Ok(Vec::new())
}

pub(crate) fn pop(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    frame.stack.pop()?;
    Ok(Vec::new())
}

pub(crate) fn mload(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let offset = frame.stack.pop()?;
    let value = frame.memory.get_word(offset.low_u64())?;
    frame.stack.push(value)?;
    Ok(Vec::new())
}

pub(crate) fn mstore(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [offset, value] = frame.stack.pop_n::<2>()?;
    frame.memory.set32(offset.low_u64(), &value)?;
    Ok(Vec::new())
}

pub(crate) fn mstore8(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [offset, value] = frame.stack.pop_n::<2>()?;
    frame.memory.set_byte(offset.low_u64(), value.low_u64() as u8)?;
    Ok(Vec::new())
}

pub(crate) fn sload(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let key = word::to_h256(&frame.stack.pop()?);
    let value = evm.state.get_state(&frame.contract.address, &key)?;
    frame.stack.push(value.to_word())?;
    Ok(Vec::new())
}

pub(crate) fn sstore(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [key, value] = frame.stack.pop_n::<2>()?;
    evm.state.set_state(
        &frame.contract.address,
        word::to_h256(&key),
        word::to_h256(&value),
    )?;
    Ok(Vec::new())
}

fn jump_to(frame: &mut Frame, dest: &Word) -> VmResult<()> {
    if !frame.contract.valid_jump_dest(dest) {
        return Err(VmError::InvalidJump(word::saturating_usize(dest)));
    }
    frame.pc = word::saturating_usize(dest);
    Ok(())
}

pub(crate) fn jump(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let dest = frame.stack.pop()?;
    jump_to(frame, &dest)?;
    Ok(Vec::new())
}

pub(crate) fn jumpi(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [dest, condition] = frame.stack.pop_n::<2>()?;
    if condition.is_zero() {
        frame.pc += 1;
    } else {
        jump_to(frame, &dest)?;
    }
    Ok(Vec::new())
}

pub(crate) fn pc(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    frame.stack.push(Word::from(frame.pc))?;
    Ok(Vec::new())
}

pub(crate) fn msize(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    frame.stack.push(Word::from(frame.memory.len()))?;
    Ok(Vec::new())
}

pub(crate) fn gas(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    frame.stack.push(Word::from(frame.contract.gas))?;
    Ok(Vec::new())
}

pub(crate) fn jumpdest(_frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    Ok(Vec::new())
}

/// PUSH1..PUSH32; immediates past the end of the code read as zero
pub(crate) fn push(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let size = frame.contract.op(frame.pc).push_size();
    let data = word::get_data(&frame.contract.code, frame.pc as u64 + 1, size as u64);
    frame.stack.push(Word::from_big_endian(&data))?;
    frame.pc += size;
    Ok(Vec::new())
}

pub(crate) fn dup(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let op = frame.contract.op(frame.pc);
    let n = op.dup_depth().ok_or(VmError::InvalidOpcode(op.0))?;
    frame.stack.dup(n)?;
    Ok(Vec::new())
}

pub(crate) fn swap(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let op = frame.contract.op(frame.pc);
    let n = op.swap_depth().ok_or(VmError::InvalidOpcode(op.0))?;
    frame.stack.swap(n)?;
    Ok(Vec::new())
}
