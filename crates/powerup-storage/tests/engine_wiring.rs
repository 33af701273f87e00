//! The engine running on the shared store and token bank

use powerup_core::prelude::*;
use powerup_economics::{LogCurve, PositionStore, RewardEngine};
use powerup_storage::{BankConfig, SharedStore, TokenBank};
use std::sync::Arc;
use tempfile::tempdir;

const POOL: PoolId = PoolId(1);

type Engine = RewardEngine<SharedStore, Arc<ManualTicks>, TokenBank, TokenBank>;

fn units(n: u64) -> Fixed {
    Fixed::from_units(n)
}

fn setup() -> (Engine, SharedStore, TokenBank, Arc<ManualTicks>) {
    let store = SharedStore::new();
    let bank = TokenBank::new(BankConfig {
        cooldown_ticks: 5,
        initial_treasury: units(1_000),
    });
    let ticks = Arc::new(ManualTicks::new(0));
    let mut engine = RewardEngine::new(
        store.clone(),
        Arc::clone(&ticks),
        bank.clone(),
        bank.clone(),
        LogCurve::default(),
    );
    engine.create_pool(POOL, units(3)).unwrap();
    (engine, store, bank, ticks)
}

fn onboard(bank: &TokenBank, label: &str, lp: u64, governance: u64) -> AccountId {
    let account = AccountId::from_label(label);
    bank.mint_lp(POOL, &account, units(lp)).unwrap();
    if governance > 0 {
        bank.mint_governance(&account, units(governance)).unwrap();
        bank.stake_governance(&account, units(governance)).unwrap();
    }
    account
}

#[test]
fn test_claim_pays_from_treasury() {
    let (mut engine, _, bank, ticks) = setup();
    let alice = onboard(&bank, "alice", 100, 100);

    ticks.set(1);
    engine.stake(POOL, alice, units(100)).unwrap();
    engine.delegate(POOL, alice, units(100)).unwrap();
    assert_eq!(bank.lp_custody(POOL), units(100));
    assert_eq!(bank.delegated_to(POOL, &alice), units(100));

    ticks.set(4);
    let paid = engine.claim_rewards(POOL, alice).unwrap();
    assert!(units(12).raw() - paid.raw() < 1_000, "paid {}", paid);
    assert_eq!(bank.governance_wallet(&alice), paid);
    assert_eq!(bank.treasury(), units(1_000).checked_sub(paid).unwrap());
}

#[test]
fn test_empty_treasury_aborts_claim() {
    let (mut engine, store, bank, ticks) = setup();
    let bob = onboard(&bank, "bob", 10, 0);
    ticks.set(1);
    engine.stake(POOL, bob, units(10)).unwrap();

    ticks.set(1_000);
    let before = store.snapshot().unwrap();
    assert!(matches!(engine.claim_rewards(POOL, bob), Err(EngineError::Ledger(_))));
    assert_eq!(store.snapshot().unwrap(), before);

    bank.fund_rewards(units(2_000)).unwrap();
    assert_eq!(engine.claim_rewards(POOL, bob).unwrap(), units(3_000));
}

#[test]
fn test_undelegate_then_cooldown() {
    let (mut engine, _, bank, ticks) = setup();
    let carol = onboard(&bank, "carol", 50, 40);
    engine.stake(POOL, carol, units(50)).unwrap();
    engine.delegate(POOL, carol, units(40)).unwrap();

    // Delegated stake is locked in the pool.
    assert!(bank.start_cooldown(&carol, units(1), 2).is_err());

    ticks.set(2);
    engine.undelegate(POOL, carol, units(40)).unwrap();
    let cooldown = bank.start_cooldown(&carol, units(40), 2).unwrap();
    assert_eq!(cooldown.ready_at, 7);
    assert_eq!(bank.withdraw(&carol, 7).unwrap(), units(40));
    assert_eq!(
        engine.account_indicators(POOL, carol).unwrap().power_up,
        "0.4".parse().unwrap()
    );
}

#[test]
fn test_snapshot_file_roundtrip_resumes_accrual() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.bin");

    let (mut engine, store, bank, ticks) = setup();
    let dave = onboard(&bank, "dave", 100, 30);
    let erin = onboard(&bank, "erin", 300, 100);
    ticks.set(2);
    engine.stake(POOL, dave, units(100)).unwrap();
    engine.delegate(POOL, dave, units(30)).unwrap();
    ticks.set(6);
    engine.stake(POOL, erin, units(300)).unwrap();
    engine.delegate(POOL, erin, units(100)).unwrap();
    ticks.set(9);
    store.save_to(&path).unwrap();

    let expected_dave = engine.account_indicators(POOL, dave).unwrap();
    let expected_pool = engine.pool_indicators(POOL).unwrap();

    let restored = SharedStore::new();
    restored.load_from(&path).unwrap();
    assert_eq!(restored.snapshot().unwrap(), store.snapshot().unwrap());
    assert_eq!(restored.position_count(), 2);

    let resumed = RewardEngine::new(restored, Arc::clone(&ticks), bank.clone(), bank, LogCurve::default());
    assert_eq!(resumed.account_indicators(POOL, dave).unwrap(), expected_dave);
    assert_eq!(resumed.pool_indicators(POOL).unwrap(), expected_pool);
    assert_eq!(resumed.store().pool_ids().unwrap(), vec![POOL]);
}

#[test]
fn test_corrupt_snapshot_rejected() {
    let store = SharedStore::new();
    assert!(matches!(store.decode(&[1, 2, 3]), Err(EngineError::Storage(_))));
    assert!(matches!(
        store.load_from(std::path::Path::new("/nonexistent/records.bin")),
        Err(EngineError::Storage(_))
    ));
}
