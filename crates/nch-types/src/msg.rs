//! Transaction messages handled by the contract VM

use bytes::Bytes;
use nch_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, Message};

/// Plain value transfer between two accounts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Amount transferred
    pub amount: U256,
}

impl Message for MsgSend {
    fn route(&self) -> &'static str {
        "nch"
    }

    fn validate_basic(&self) -> Result<(), CodecError> {
        if self.from.is_zero() {
            return Err(CodecError::Invalid("missing sender".into()));
        }
        if self.to.is_zero() {
            return Err(CodecError::Invalid("missing recipient".into()));
        }
        Ok(())
    }
}

/// Contract call or, when `to` is absent, contract creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgContract {
    /// Caller
    pub from: Address,
    /// Callee; `None` creates a contract from `payload`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Call data, or init code for a creation
    #[serde(with = "crate::serde_hex")]
    pub payload: Bytes,
    /// Value transferred with the call
    #[serde(default)]
    pub amount: U256,
}

impl MsgContract {
    /// True when the message creates a contract
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

impl Message for MsgContract {
    fn route(&self) -> &'static str {
        "vm"
    }

    fn validate_basic(&self) -> Result<(), CodecError> {
        if self.from.is_zero() {
            return Err(CodecError::Invalid("missing sender".into()));
        }
        if self.is_create() && self.payload.is_empty() {
            return Err(CodecError::Invalid("contract creation without code".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_msg_create_requires_code() {
        let msg = MsgContract {
            from: Address::from_bytes([1; 20]),
            to: None,
            payload: Bytes::new(),
            amount: U256::zero(),
        };
        assert!(msg.is_create());
        assert!(matches!(msg.validate_basic(), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_contract_msg_json_omits_missing_recipient() {
        let msg = MsgContract {
            from: Address::from_bytes([1; 20]),
            to: None,
            payload: Bytes::from_static(&[0x60, 0x00]),
            amount: U256::from(5u64),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("to").is_none());
        assert_eq!(value["payload"], "0x6000");
    }

    #[test]
    fn test_send_requires_both_parties() {
        let msg = MsgSend {
            from: Address::from_bytes([1; 20]),
            to: Address::ZERO,
            amount: U256::one(),
        };
        assert!(msg.validate_basic().is_err());
    }
}
