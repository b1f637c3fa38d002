//! VM error types

use nch_storage::StorageError;
use thiserror::Error;

/// Errors raised while executing a call frame.
///
/// Most kinds terminate only the failing frame; the caller observes them as a
/// failed call status. [`VmError::is_fatal`] kinds abort the whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Pop or peek below the bottom of the stack
    #[error("stack underflow")]
    StackUnderflow,

    /// Push beyond the stack limit
    #[error("stack overflow")]
    StackOverflow,

    /// Undefined opcode, or one not enabled in the active protocol version
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Jump to a location that is not a JUMPDEST
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// Gas exhausted
    #[error("out of gas")]
    OutOfGas,

    /// A gas computation overflowed 64 bits
    #[error("gas uint64 overflow")]
    GasUintOverflow,

    /// Deployed code exceeds the configured maximum
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    /// Creation target already has code or a nonce
    #[error("contract address collision")]
    ContractAddressCollision,

    /// State modification attempted in a static context
    #[error("write protection")]
    WriteProtection,

    /// Caller cannot cover the transferred value
    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    /// Call depth limit reached
    #[error("max call depth exceeded")]
    CallDepthExceeded,

    /// REVERT executed; the reason travels as the call output.
    ///
    /// Frames report it as [`CallStatus::Reverted`](crate::CallStatus::Reverted).
    #[error("execution reverted")]
    ExecutionReverted,

    /// RETURNDATACOPY beyond the available return data
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Not enough gas left to pay for storing the created code
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,

    /// Memory accessed beyond its current size
    #[error("memory access out of bounds")]
    MemoryOutOfBounds,

    /// Revert to a snapshot that does not exist
    #[error("invalid snapshot id: {0}")]
    InvalidSnapshot(usize),

    /// Refund counter would go below zero
    #[error("refund counter below zero")]
    RefundUnderflow,

    /// Persistent store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl VmError {
    /// Fatal errors abort the whole transaction instead of only the current frame
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VmError::GasUintOverflow
                | VmError::Storage(_)
                | VmError::InvalidSnapshot(_)
                | VmError::RefundUnderflow
        )
    }
}

impl From<StorageError> for VmError {
    fn from(e: StorageError) -> Self {
        VmError::Storage(e.to_string())
    }
}

/// Result type for VM operations
pub type VmResult<T> = Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(VmError::GasUintOverflow.is_fatal());
        assert!(VmError::Storage("io".into()).is_fatal());
        assert!(!VmError::OutOfGas.is_fatal());
        assert!(!VmError::ExecutionReverted.is_fatal());
        assert!(!VmError::ContractAddressCollision.is_fatal());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(VmError::InvalidOpcode(0xfe).to_string(), "invalid opcode: 0xfe");
        assert_eq!(
            VmError::from(StorageError::NotOpen).to_string(),
            "storage error: database not open"
        );
    }
}
