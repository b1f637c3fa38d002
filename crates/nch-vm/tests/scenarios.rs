//! End-to-end transaction scenarios

use std::sync::Arc;

use nch_primitives::{Address, H256, U256};
use nch_storage::{Database, MemoryDb, StateDb};
use nch_vm::{
    apply_message, create2_address, create_address, BlockContext, CallStatus, CommitStateDB,
    Keeper, Message, ProtocolVersion, TransitionError, TxContext, TxOutput, VmError, VmParams,
};
use proptest::prelude::*;

// ==================== Helpers ====================

struct Env {
    state: CommitStateDB,
    block: BlockContext,
    tx: TxContext,
    params: VmParams,
}

impl Env {
    fn new(version: ProtocolVersion) -> Self {
        Self {
            state: CommitStateDB::new(StateDb::new(Arc::new(MemoryDb::new()))),
            block: BlockContext::default(),
            tx: TxContext::default(),
            params: VmParams::with_version(version),
        }
    }

    fn apply(&mut self, msg: &Message) -> Result<TxOutput, TransitionError> {
        apply_message(&mut self.state, &self.block, &self.tx, &self.params, msg)
    }
}

fn addr(b: u8) -> Address {
    Address::from_bytes([b; 20])
}

fn slot(n: u64) -> H256 {
    H256::from_word(U256::from(n))
}

/// CALL-family argument prologue: zero-length input and output, then the
/// target and a fixed gas allowance
fn push_call(code: &mut Vec<u8>, to: Address, with_value: bool) {
    let zeros = if with_value { 5 } else { 4 };
    for _ in 0..zeros {
        code.extend_from_slice(&[0x60, 0x00]);
    }
    code.push(0x73);
    code.extend_from_slice(to.as_bytes());
    code.extend_from_slice(&[0x61, 0xff, 0xff]);
}

// ==================== Scenarios ====================

#[test]
fn test_value_transfer_to_account_without_code() {
    let mut env = Env::new(ProtocolVersion::V1);
    env.state.add_balance(&addr(1), U256::from(1000u64)).unwrap();

    let out = env
        .apply(&Message::call(addr(1), addr(2), Vec::new(), U256::from(300u64), 21_000))
        .unwrap();

    assert!(out.is_success());
    assert_eq!(env.state.get_balance(&addr(1)).unwrap(), U256::from(700u64));
    assert_eq!(env.state.get_balance(&addr(2)).unwrap(), U256::from(300u64));
    assert!(out.logs.is_empty());
    assert_eq!(out.gas_used, 21_000);
}

#[test]
fn test_out_of_gas_after_storage_write_reverts_it_and_burns_all_gas() {
    let mut env = Env::new(ProtocolVersion::V1);
    let contract = addr(0xc0);
    // SSTORE(0, 1) then JUMPDEST; JUMP(5) forever
    env.state
        .set_code(&contract, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x5b, 0x60, 0x05, 0x56])
        .unwrap();

    let out = env
        .apply(&Message::call(addr(1), contract, Vec::new(), U256::zero(), 100_000))
        .unwrap();

    assert_eq!(out.status, CallStatus::Failed(VmError::OutOfGas));
    assert_eq!(out.gas_used, 100_000);
    assert_eq!(out.gas_refunded, 0);
    assert_eq!(env.state.get_state(&contract, &slot(0)).unwrap(), H256::ZERO);
    assert_eq!(env.state.get_nonce(&addr(1)).unwrap(), 1);
}

#[test]
fn test_create_onto_existing_code_collides_without_transfer() {
    let mut env = Env::new(ProtocolVersion::V1);
    let sender = addr(1);
    let target = create_address(&sender, 0);
    env.state.add_balance(&sender, U256::from(100u64)).unwrap();
    env.state.set_code(&target, vec![0x00]).unwrap();

    let out = env
        .apply(&Message::create(sender, vec![0x00], U256::from(10u64), 100_000))
        .unwrap();

    assert_eq!(out.status, CallStatus::Failed(VmError::ContractAddressCollision));
    assert_eq!(out.contract_address, None);
    // 53000 base plus one zero byte of init code
    assert_eq!(out.gas_used, 53_004);
    assert_eq!(env.state.get_balance(&sender).unwrap(), U256::from(100u64));
    assert_eq!(env.state.get_balance(&target).unwrap(), U256::zero());
}

#[test]
fn test_caller_continues_after_sub_call_revert() {
    let mut env = Env::new(ProtocolVersion::V1);
    let (outer, inner) = (addr(0xa0), addr(0xb0));
    // SSTORE(0, 7); REVERT(0, 0)
    env.state
        .set_code(&inner, vec![0x60, 0x07, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0xfd])
        .unwrap();

    let mut code = Vec::new();
    push_call(&mut code, inner, true);
    // CALL; SSTORE(1, ISZERO(result)); SSTORE(2, 42); STOP
    code.extend_from_slice(&[0xf1, 0x15, 0x60, 0x01, 0x55, 0x60, 0x2a, 0x60, 0x02, 0x55, 0x00]);
    env.state.set_code(&outer, code).unwrap();

    let out = env
        .apply(&Message::call(addr(1), outer, Vec::new(), U256::zero(), 200_000))
        .unwrap();

    assert!(out.is_success());
    assert_eq!(env.state.get_state(&inner, &slot(0)).unwrap(), H256::ZERO);
    assert_eq!(env.state.get_state(&outer, &slot(1)).unwrap(), slot(1));
    assert_eq!(env.state.get_state(&outer, &slot(2)).unwrap(), slot(42));
}

#[test]
fn test_static_call_cannot_write_storage() {
    let mut env = Env::new(ProtocolVersion::V1);
    let (outer, inner) = (addr(0xa0), addr(0xb0));
    // SSTORE(0, 1); STOP
    env.state
        .set_code(&inner, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00])
        .unwrap();

    let mut code = Vec::new();
    push_call(&mut code, inner, false);
    // STATICCALL; SSTORE(0, ISZERO(result)); STOP
    code.extend_from_slice(&[0xfa, 0x15, 0x60, 0x00, 0x55, 0x00]);
    env.state.set_code(&outer, code).unwrap();

    let out = env
        .apply(&Message::call(addr(1), outer, Vec::new(), U256::zero(), 200_000))
        .unwrap();

    assert!(out.is_success());
    assert_eq!(env.state.get_state(&inner, &slot(0)).unwrap(), H256::ZERO);
    assert_eq!(env.state.get_state(&outer, &slot(0)).unwrap(), slot(1));
}

#[test]
fn test_logs_of_reverted_frames_are_dropped() {
    let mut env = Env::new(ProtocolVersion::V1);
    let (outer, inner) = (addr(0xa0), addr(0xb0));
    // LOG0(0, 0); REVERT(0, 0)
    env.state
        .set_code(&inner, vec![0x60, 0x00, 0x60, 0x00, 0xa0, 0x60, 0x00, 0x60, 0x00, 0xfd])
        .unwrap();

    // LOG0(0, 0); CALL inner; STOP
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0xa0];
    push_call(&mut code, inner, true);
    code.extend_from_slice(&[0xf1, 0x00]);
    env.state.set_code(&outer, code).unwrap();

    let out = env
        .apply(&Message::call(addr(1), outer, Vec::new(), U256::zero(), 200_000))
        .unwrap();

    assert!(out.is_success());
    assert_eq!(out.logs.len(), 1);
    assert_eq!(out.logs[0].address, outer);
}

#[test]
fn test_refund_is_capped_at_half_the_gas_used() {
    let mut env = Env::new(ProtocolVersion::V1);
    let contract = addr(0xc0);
    // SSTORE(0, 0); STOP
    env.state
        .set_code(&contract, vec![0x60, 0x00, 0x60, 0x00, 0x55, 0x00])
        .unwrap();
    env.state.set_state(&contract, slot(0), slot(1)).unwrap();
    env.state.commit(true).unwrap();

    let out = env
        .apply(&Message::call(addr(1), contract, Vec::new(), U256::zero(), 100_000))
        .unwrap();

    assert!(out.is_success());
    // 21000 + 3 + 3 + 5000 consumed, 15000 earned, half of 26006 granted
    assert_eq!(out.gas_refunded, 13_003);
    assert_eq!(out.gas_used, 13_003);
    assert_eq!(env.state.get_state(&contract, &slot(0)).unwrap(), H256::ZERO);
}

#[test]
fn test_gas_overflow_aborts_the_whole_transaction() {
    let mut env = Env::new(ProtocolVersion::V1);
    let contract = addr(0xc0);
    env.state.add_balance(&addr(1), U256::from(50u64)).unwrap();
    // MSTORE(2^256 - 1, 1)
    let mut code = vec![0x60, 0x01, 0x7f];
    code.extend_from_slice(&[0xff; 32]);
    code.push(0x52);
    env.state.set_code(&contract, code).unwrap();

    let err = env
        .apply(&Message::call(addr(1), contract, Vec::new(), U256::from(5u64), 100_000))
        .unwrap_err();

    assert_eq!(err, TransitionError::Vm(VmError::GasUintOverflow));
    assert_eq!(env.state.get_nonce(&addr(1)).unwrap(), 0);
    assert_eq!(env.state.get_balance(&addr(1)).unwrap(), U256::from(50u64));
    assert_eq!(env.state.get_balance(&contract).unwrap(), U256::zero());
}

#[test]
fn test_created_addresses_are_deterministic() {
    let sender = addr(1);
    // init code returning a single STOP byte
    let init = hex::decode("600060005360016000f3").unwrap();

    let mut env = Env::new(ProtocolVersion::V1);
    let out = env
        .apply(&Message::create(sender, init.clone(), U256::zero(), 100_000))
        .unwrap();
    assert_eq!(out.contract_address, Some(create_address(&sender, 0)));
    assert_eq!(env.state.get_code(&create_address(&sender, 0)).unwrap(), vec![0x00]);

    let salt = slot(9);
    let out = env
        .apply(&Message::create2(sender, init.clone(), salt, U256::zero(), 100_000))
        .unwrap();
    assert_eq!(out.contract_address, Some(create2_address(&sender, &salt, &init)));

    // same salt and code again lands on the occupied address
    let out = env
        .apply(&Message::create2(sender, init, salt, U256::zero(), 100_000))
        .unwrap();
    assert_eq!(out.status, CallStatus::Failed(VmError::ContractAddressCollision));
}

#[test]
fn test_keeper_state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let init = hex::decode("600060005360016000f3").unwrap();
    let contract = {
        let db = Database::open_at(dir.path()).unwrap();
        let keeper = Keeper::new(StateDb::new(Arc::new(db)), VmParams::default());
        keeper.add_balance(&addr(1), U256::from(9u64)).unwrap();
        let out = keeper
            .apply_message(
                &BlockContext::default(),
                &TxContext::default(),
                &Message::create(addr(1), init, U256::from(4u64), 100_000),
            )
            .unwrap();
        out.contract_address.unwrap()
    };

    let db = Database::open_at(dir.path()).unwrap();
    let keeper = Keeper::new(StateDb::new(Arc::new(db)), VmParams::default());
    assert_eq!(keeper.get_code(&contract).unwrap(), vec![0x00]);
    assert_eq!(keeper.get_balance(&contract).unwrap(), U256::from(4u64));
    assert_eq!(keeper.get_balance(&addr(1)).unwrap(), U256::from(5u64));
    assert_eq!(keeper.get_nonce(&addr(1)).unwrap(), 1);
    assert_eq!(keeper.all_contract_addresses().unwrap(), vec![contract]);
}

#[test]
fn test_oversized_runtime_code_is_rejected_only_under_v1() {
    let sender = addr(1);
    // RETURN(0, 0x6001): one byte over the default code size limit
    let init = hex::decode("6160016000f3").unwrap();
    let target = create_address(&sender, 0);

    let mut env = Env::new(ProtocolVersion::V1);
    let out = env
        .apply(&Message::create(sender, init.clone(), U256::zero(), 1_000_000))
        .unwrap();
    assert_eq!(out.status, CallStatus::Failed(VmError::MaxCodeSizeExceeded));
    assert_eq!(out.gas_used, 1_000_000);
    assert_eq!(out.contract_address, None);
    assert!(env.state.get_code(&target).unwrap().is_empty());
    assert!(!env.state.exist(&target).unwrap());
    assert_eq!(env.state.get_nonce(&sender).unwrap(), 1);

    let mut env = Env::new(ProtocolVersion::V0);
    let out = env
        .apply(&Message::create(sender, init, U256::zero(), 10_000_000))
        .unwrap();
    assert!(out.is_success());
    assert_eq!(out.contract_address, Some(target));
    assert_eq!(env.state.get_code_size(&target).unwrap(), 0x6001);
}

#[test]
fn test_code_deposit_beyond_remaining_gas_fails_the_creation() {
    let mut env = Env::new(ProtocolVersion::V1);
    let sender = addr(1);
    env.state.add_balance(&sender, U256::from(50u64)).unwrap();
    // RETURN(0, 100): 20000 gas of deposit against about 7000 left
    let init = hex::decode("60646000f3").unwrap();

    let out = env
        .apply(&Message::create(sender, init, U256::from(5u64), 60_000))
        .unwrap();

    assert_eq!(out.status, CallStatus::Failed(VmError::CodeStoreOutOfGas));
    assert_eq!(out.gas_used, 60_000);
    let target = create_address(&sender, 0);
    assert!(env.state.get_code(&target).unwrap().is_empty());
    assert_eq!(env.state.get_balance(&target).unwrap(), U256::zero());
    assert_eq!(env.state.get_balance(&sender).unwrap(), U256::from(50u64));
}

#[test]
fn test_return_data_copy_past_the_end_fails_the_frame() {
    let mut env = Env::new(ProtocolVersion::V1);
    let contract = addr(0xc0);
    // SSTORE(0, 1); RETURNDATACOPY(0, 0, 1) with no return data; STOP
    env.state
        .set_code(&contract, hex::decode("60016000556001600060003e00").unwrap())
        .unwrap();

    let out = env
        .apply(&Message::call(addr(1), contract, Vec::new(), U256::zero(), 100_000))
        .unwrap();

    assert_eq!(out.status, CallStatus::Failed(VmError::ReturnDataOutOfBounds));
    assert_eq!(out.gas_used, 100_000);
    assert_eq!(env.state.get_state(&contract, &slot(0)).unwrap(), H256::ZERO);
}

#[test]
fn test_nested_value_call_without_funds_pushes_failure() {
    let mut env = Env::new(ProtocolVersion::V1);
    let (outer, inner) = (addr(0xa0), addr(0xb0));
    // SSTORE(0, 1); STOP
    env.state
        .set_code(&inner, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00])
        .unwrap();

    // CALL(0xffff, inner, 1, 0, 0, 0, 0) from an account holding nothing
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x01, 0x73];
    code.extend_from_slice(inner.as_bytes());
    code.extend_from_slice(&[0x61, 0xff, 0xff]);
    // CALL; SSTORE(0, ISZERO(result)); STOP
    code.extend_from_slice(&[0xf1, 0x15, 0x60, 0x00, 0x55, 0x00]);
    env.state.set_code(&outer, code).unwrap();

    let out = env
        .apply(&Message::call(addr(1), outer, Vec::new(), U256::zero(), 200_000))
        .unwrap();

    assert!(out.is_success());
    assert_eq!(env.state.get_state(&outer, &slot(0)).unwrap(), slot(1));
    assert_eq!(env.state.get_state(&inner, &slot(0)).unwrap(), H256::ZERO);
    assert_eq!(env.state.get_balance(&inner).unwrap(), U256::zero());
}

// ==================== Snapshot law ====================

#[derive(Clone, Debug)]
enum Op {
    Balance(u8, u64),
    Nonce(u8, u64),
    Store(u8, u8, u64),
    Create(u8),
    Suicide(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4u8, any::<u64>()).prop_map(|(a, v)| Op::Balance(a, v)),
        (0..4u8, any::<u64>()).prop_map(|(a, v)| Op::Nonce(a, v)),
        (0..4u8, 0..4u8, any::<u64>()).prop_map(|(a, k, v)| Op::Store(a, k, v)),
        (0..4u8).prop_map(Op::Create),
        (0..4u8).prop_map(Op::Suicide),
    ]
}

fn apply_op(state: &mut CommitStateDB, op: &Op) {
    match *op {
        Op::Balance(a, v) => state.set_balance(&addr(a), U256::from(v)).unwrap(),
        Op::Nonce(a, v) => state.set_nonce(&addr(a), v).unwrap(),
        Op::Store(a, k, v) => state.set_state(&addr(a), slot(k as u64), slot(v)).unwrap(),
        Op::Create(a) => state.create_account(addr(a)).unwrap(),
        Op::Suicide(a) => {
            state.suicide(&addr(a)).unwrap();
        }
    }
}

type Observed = Vec<(bool, bool, U256, u64, Vec<H256>)>;

fn observe(state: &mut CommitStateDB) -> Observed {
    (0..4u8)
        .map(|a| {
            let a = addr(a);
            (
                state.exist(&a).unwrap(),
                state.has_suicided(&a).unwrap(),
                state.get_balance(&a).unwrap(),
                state.get_nonce(&a).unwrap(),
                (0..4).map(|k| state.get_state(&a, &slot(k)).unwrap()).collect(),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_revert_restores_snapshot_view(
        before in prop::collection::vec(op_strategy(), 0..12),
        after in prop::collection::vec(op_strategy(), 1..12),
    ) {
        let mut state = CommitStateDB::new(StateDb::new(Arc::new(MemoryDb::new())));
        for op in &before {
            apply_op(&mut state, op);
        }
        let expected = observe(&mut state);
        let snapshot = state.snapshot();
        for op in &after {
            apply_op(&mut state, op);
        }
        state.revert_to_snapshot(snapshot).unwrap();
        prop_assert_eq!(observe(&mut state), expected);
    }
}
