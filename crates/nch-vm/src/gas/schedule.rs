//! Protocol-version gated gas parameters

use serde::{Deserialize, Serialize};

use crate::gas::cost;

/// Protocol version active at a block height
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Initial rules
    V0,
    /// Upgraded rules: repriced state access, net-metered SSTORE, code size limit
    #[default]
    V1,
}

/// How SSTORE is priced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SstoreScheme {
    /// Set/reset pricing based on the current value only
    Legacy,
    /// Net metering against the value at the start of the transaction
    NetMetered,
}

/// Gas constants and rule switches that differ between protocol versions.
///
/// Passed explicitly to every cost function; nothing branches on a global flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasSchedule {
    /// Version the schedule belongs to
    pub version: ProtocolVersion,
    /// EXP cost per byte of exponent
    pub exp_byte: u64,
    /// SLOAD
    pub sload: u64,
    /// BALANCE
    pub balance: u64,
    /// EXTCODESIZE
    pub ext_code_size: u64,
    /// EXTCODECOPY base cost
    pub ext_code_copy: u64,
    /// EXTCODEHASH
    pub ext_code_hash: u64,
    /// CALL, CALLCODE, DELEGATECALL, STATICCALL base cost
    pub call: u64,
    /// SELFDESTRUCT base cost
    pub self_destruct: u64,
    /// Intrinsic cost of a non-zero byte of transaction data
    pub tx_data_non_zero: u64,
    /// SSTORE pricing
    pub sstore: SstoreScheme,
    /// Empty accounts count as absent for new-account charges and value-less calls
    pub empty_is_absent: bool,
    /// CHAINID and SELFBALANCE are defined
    pub chain_id_opcodes: bool,
    /// Deployed code is limited to the configured maximum size
    pub limit_code_size: bool,
    /// Nonce given to freshly created contracts
    pub new_contract_nonce: u64,
}

static V0_SCHEDULE: GasSchedule = GasSchedule {
    version: ProtocolVersion::V0,
    exp_byte: 10,
    sload: 200,
    balance: 400,
    ext_code_size: 700,
    ext_code_copy: 700,
    ext_code_hash: 400,
    call: 700,
    self_destruct: cost::SELFDESTRUCT,
    tx_data_non_zero: 68,
    sstore: SstoreScheme::Legacy,
    empty_is_absent: false,
    chain_id_opcodes: false,
    limit_code_size: false,
    new_contract_nonce: 0,
};

static V1_SCHEDULE: GasSchedule = GasSchedule {
    version: ProtocolVersion::V1,
    exp_byte: 50,
    sload: 800,
    balance: 700,
    ext_code_size: 700,
    ext_code_copy: 700,
    ext_code_hash: 700,
    call: 700,
    self_destruct: cost::SELFDESTRUCT,
    tx_data_non_zero: 16,
    sstore: SstoreScheme::NetMetered,
    empty_is_absent: true,
    chain_id_opcodes: true,
    limit_code_size: true,
    new_contract_nonce: 1,
};

impl GasSchedule {
    /// Schedule for a protocol version
    pub fn for_version(version: ProtocolVersion) -> &'static GasSchedule {
        match version {
            ProtocolVersion::V0 => &V0_SCHEDULE,
            ProtocolVersion::V1 => &V1_SCHEDULE,
        }
    }
}
