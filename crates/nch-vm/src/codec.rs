//! Message types the VM module registers with the codec

use nch_types::{CodecError, MsgContract, MsgSend, Registry};

/// Registered name of [`MsgSend`]
pub const MSG_SEND: &str = "nch/send";
/// Registered name of [`MsgContract`]
pub const MSG_CONTRACT: &str = "nch/MsgContract";

/// Register the VM's messages
pub fn register_messages(registry: &mut Registry) -> Result<(), CodecError> {
    registry
        .register::<MsgSend>(MSG_SEND)?
        .register::<MsgContract>(MSG_CONTRACT)?;
    Ok(())
}

/// A sealed registry holding the VM's messages
pub fn message_registry() -> Result<Registry, CodecError> {
    let mut registry = Registry::new();
    register_messages(&mut registry)?;
    registry.seal();
    Ok(registry)
}
