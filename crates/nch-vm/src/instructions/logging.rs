//! LOG0..LOG4

use bytes::Bytes;
use nch_types::Log;

use crate::error::{VmError, VmResult};
use crate::evm::Evm;
use crate::interpreter::Frame;
use crate::word;

pub(crate) fn log(frame: &mut Frame, evm: &mut Evm<'_>) -> VmResult<Vec<u8>> {
    let op = frame.contract.op(frame.pc);
    let topic_count = op.log_topics().ok_or(VmError::InvalidOpcode(op.0))?;

    let [offset, size] = frame.stack.pop_n::<2>()?;
    let mut topics = Vec::with_capacity(topic_count);
    for _ in 0..topic_count {
        topics.push(word::to_h256(&frame.stack.pop()?));
    }
    let data = frame.memory.get_copy(offset.low_u64(), size.low_u64())?;

    evm.state
        .add_log(Log::new(frame.contract.address, topics, Bytes::from(data)));
    Ok(Vec::new())
}
