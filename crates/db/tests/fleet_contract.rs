use std::sync::Arc;

use rust_decimal::Decimal;

use rentline_core::domain::equipment::{EquipmentId, EquipmentStatus};
use rentline_core::inventory::{InventoryCache, InventoryCacheConfig, ReserveResult};
use rentline_core::ledger::EquipmentLedger;
use rentline_db::{connect_with_settings, migrations, seed_fleet, DbPool, SqlEquipmentLedger};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    seed_fleet(&pool).await.expect("seed");
    pool
}

#[tokio::test]
async fn seed_fleet_matches_contract() {
    let pool = seeded_pool().await;
    let ledger = SqlEquipmentLedger::new(pool);
    let records = ledger.read_all().await.expect("read all");

    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|record| record.validate().is_ok()));
    assert_eq!(records.iter().filter(|record| record.is_available()).count(), 8);

    let negotiable = records
        .iter()
        .find(|record| record.equipment_id == EquipmentId::from("EQ008"))
        .expect("EQ008 seeded");
    assert_eq!(negotiable.daily_rate, Decimal::from(2200));
    assert_eq!(negotiable.max_rate, Decimal::from(2600));

    let ceiling_priced = records
        .iter()
        .find(|record| record.equipment_id == EquipmentId::from("EQ010"))
        .expect("EQ010 seeded");
    assert_eq!(ceiling_priced.daily_rate, ceiling_priced.max_rate);
}

#[tokio::test]
async fn reseeding_is_idempotent_and_restores_statuses() {
    let pool = seeded_pool().await;
    let ledger = SqlEquipmentLedger::new(pool.clone());
    let id = EquipmentId::from("EQ001");

    let swapped = ledger
        .compare_and_set_status(&id, EquipmentStatus::Available, EquipmentStatus::Rented)
        .await
        .expect("cas");
    assert!(swapped);

    let summary = seed_fleet(&pool).await.expect("reseed");
    assert_eq!(summary.inserted, 10);

    assert_eq!(ledger.read_status(&id).await.expect("status"), EquipmentStatus::Available);
    assert_eq!(ledger.read_all().await.expect("read all").len(), 10);
}

#[tokio::test]
async fn concurrent_reserves_grant_one_winner() {
    let pool = seeded_pool().await;
    let ledger: Arc<dyn EquipmentLedger> = Arc::new(SqlEquipmentLedger::new(pool));
    let cache = Arc::new(InventoryCache::new(ledger, InventoryCacheConfig::default()));
    let id = EquipmentId::from("EQ008");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let id = id.clone();
        handles.push(tokio::spawn(async move { cache.reserve(&id).await }));
    }

    let mut successes = 0usize;
    let mut already_taken = 0usize;
    for handle in handles {
        match handle.await.expect("task").expect("reserve") {
            ReserveResult::Success => successes += 1,
            ReserveResult::AlreadyTaken => already_taken += 1,
            ReserveResult::NotFound => panic!("seeded unit vanished"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already_taken, 7);
}
