//! Hashing, call environment and block information

use nch_crypto::keccak256 as hash;

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::interpreter::Frame;
use crate::word::{self, Word};

fn push(frame: &mut Frame, value: Word) -> VmResult<Vec<u8>> {
    frame.stack.push(value)?;
    Ok(Vec::new())
}

pub(crate) fn keccak256(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [offset, size] = frame.stack.pop_n::<2>()?;
    let data = frame.memory.get_ptr(offset.low_u64(), size.low_u64())?;
    let digest = hash(data);
    if evm.params.record_preimages {
        evm.state.add_preimage(digest, data.to_vec());
    }
    push(frame, digest.to_word())
}

pub(crate) fn address(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let address = frame.contract.address.to_word();
    push(frame, address)
}

pub(crate) fn balance(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let address = word::to_address(&frame.stack.pop()?);
    let balance = evm.state.get_balance(&address)?;
    push(frame, balance)
}

pub(crate) fn origin(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, evm.tx.origin.to_word())
}

pub(crate) fn caller(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let caller = frame.contract.caller.to_word();
    push(frame, caller)
}

pub(crate) fn call_value(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let value = frame.contract.value;
    push(frame, value)
}

pub(crate) fn call_data_load(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let offset = word::checked_u64(&frame.stack.pop()?).unwrap_or(u64::MAX);
    let data = word::get_data(&frame.contract.input, offset, 32);
    push(frame, Word::from_big_endian(&data))
}

pub(crate) fn call_data_size(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let size = Word::from(frame.contract.input.len());
    push(frame, size)
}

/// Copy `source[data_offset..]` into memory, zero-padded to `length`
fn copy_to_memory(
    frame: &mut Frame,
    source: &[u8],
    mem_offset: Word,
    data_offset: Word,
    length: Word,
) -> VmResult<()> {
    if length.is_zero() {
        return Ok(());
    }
    let data_offset = word::checked_u64(&data_offset).unwrap_or(u64::MAX);
    let data = word::get_data(source, data_offset, length.low_u64());
    frame
        .memory
        .set(mem_offset.low_u64(), length.low_u64(), &data)
}

pub(crate) fn call_data_copy(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [mem_offset, data_offset, length] = frame.stack.pop_n::<3>()?;
    let input = std::mem::take(&mut frame.contract.input);
    let result = copy_to_memory(frame, &input, mem_offset, data_offset, length);
    frame.contract.input = input;
    result.map(|_| Vec::new())
}

pub(crate) fn code_size(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let size = Word::from(frame.contract.code.len());
    push(frame, size)
}

pub(crate) fn code_copy(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [mem_offset, code_offset, length] = frame.stack.pop_n::<3>()?;
    let code = std::mem::take(&mut frame.contract.code);
    let result = copy_to_memory(frame, &code, mem_offset, code_offset, length);
    frame.contract.code = code;
    result.map(|_| Vec::new())
}

pub(crate) fn gas_price(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, evm.tx.gas_price)
}

pub(crate) fn ext_code_size(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let address = word::to_address(&frame.stack.pop()?);
    let size = evm.state.get_code_size(&address)?;
    push(frame, Word::from(size))
}

pub(crate) fn ext_code_copy(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [address, mem_offset, code_offset, length] = frame.stack.pop_n::<4>()?;
    let code = evm.state.get_code(&word::to_address(&address))?;
    copy_to_memory(frame, &code, mem_offset, code_offset, length)?;
    Ok(Vec::new())
}

pub(crate) fn return_data_size(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let size = Word::from(frame.return_data.len());
    push(frame, size)
}

pub(crate) fn return_data_copy(frame: &mut Frame, _evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let [mem_offset, data_offset, length] = frame.stack.pop_n::<3>()?;
    let start = word::checked_u64(&data_offset).ok_or(VmError::ReturnDataOutOfBounds)?;
    let end = start
        .checked_add(length.low_u64())
        .ok_or(VmError::ReturnDataOutOfBounds)?;
    if end > frame.return_data.len() as u64 {
        return Err(VmError::ReturnDataOutOfBounds);
    }
    let data = frame.return_data[start as usize..end as usize].to_vec();
    frame.memory.set(mem_offset.low_u64(), length.low_u64(), &data)?;
    Ok(Vec::new())
}

/// Code hash, or zero for an empty account
pub(crate) fn ext_code_hash(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let address = word::to_address(&frame.stack.pop()?);
    let value = if evm.state.empty(&address)? {
        Word::zero()
    } else {
        evm.state.get_code_hash(&address)?.to_word()
    };
    push(frame, value)
}

pub(crate) fn block_hash(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let number = frame.stack.pop()?;
    let value = match word::checked_u64(&number) {
        Some(n) => evm.block.block_hash(n).to_word(),
        None => Word::zero(),
    };
    push(frame, value)
}

pub(crate) fn coinbase(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, evm.block.coinbase.to_word())
}

pub(crate) fn timestamp(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, Word::from(evm.block.timestamp))
}

pub(crate) fn number(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, Word::from(evm.block.number))
}

pub(crate) fn difficulty(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, evm.block.difficulty)
}

pub(crate) fn gas_limit(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, Word::from(evm.block.gas_limit))
}

pub(crate) fn chain_id(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    push(frame, evm.block.chain_id)
}

pub(crate) fn self_balance(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let balance = evm.state.get_balance(&frame.contract.address)?;
    push(frame, balance)
}
