use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};
use crate::errors::LedgerError;
use crate::ledger::EquipmentLedger;

/// Immutable, timestamped view of all equipment rows. Superseded wholesale
/// by a newer snapshot, never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    records: Vec<EquipmentRecord>,
    captured_at: DateTime<Utc>,
}

impl InventorySnapshot {
    pub fn new(mut records: Vec<EquipmentRecord>) -> Self {
        records.sort_by(|a, b| a.equipment_id.cmp(&b.equipment_id));
        Self { records, captured_at: Utc::now() }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    pub fn find(&self, equipment_id: &EquipmentId) -> Option<&EquipmentRecord> {
        self.records.iter().find(|record| &record.equipment_id == equipment_id)
    }

    /// Only AVAILABLE rows are ever offered to a caller.
    pub fn available(&self) -> Vec<&EquipmentRecord> {
        self.records.iter().filter(|record| record.is_available()).collect()
    }

    pub fn available_excluding(&self, excluded: &BTreeSet<EquipmentId>) -> Vec<&EquipmentRecord> {
        self.records
            .iter()
            .filter(|record| record.is_available() && !excluded.contains(&record.equipment_id))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveResult {
    Success,
    AlreadyTaken,
    NotFound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InventoryCacheConfig {
    /// Snapshot age beyond which a read triggers a refresh.
    pub staleness: Duration,
    /// Bound on a single `read_all` refresh; on expiry the last-known
    /// snapshot is served instead.
    pub refresh_timeout: Duration,
    /// Tight bound on each ledger call inside `reserve`.
    pub reserve_timeout: Duration,
}

impl Default for InventoryCacheConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(3),
            reserve_timeout: Duration::from_secs(5),
        }
    }
}

struct CacheState {
    snapshot: Arc<InventorySnapshot>,
    // None forces the next read to refresh; Instant keeps staleness
    // arithmetic monotonic regardless of wall-clock adjustments.
    refreshed_at: Option<Instant>,
}

/// Owner of the current snapshot and of the one atomic operation in the
/// system. Reads during stages 1-6 tolerate bounded staleness; only the
/// final reserve re-reads the ledger authoritatively.
pub struct InventoryCache {
    ledger: Arc<dyn EquipmentLedger>,
    config: InventoryCacheConfig,
    state: RwLock<CacheState>,
    refresh_gate: Mutex<()>,
    reserve_locks: std::sync::Mutex<HashMap<EquipmentId, Arc<Mutex<()>>>>,
}

impl InventoryCache {
    pub fn new(ledger: Arc<dyn EquipmentLedger>, config: InventoryCacheConfig) -> Self {
        Self {
            ledger,
            config,
            state: RwLock::new(CacheState {
                snapshot: Arc::new(InventorySnapshot::empty()),
                refreshed_at: None,
            }),
            refresh_gate: Mutex::new(()),
            reserve_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot, refreshed when stale. Ledger faults degrade to the
    /// last-known snapshot (or an empty one) so inventory reads never block
    /// a call.
    pub async fn get_snapshot(&self) -> Arc<InventorySnapshot> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot;
        }

        // One refresher at a time; waiters re-check freshness once inside.
        let _gate = self.refresh_gate.lock().await;
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot;
        }

        match bounded(self.config.refresh_timeout, self.ledger.read_all()).await {
            Ok(records) => {
                let snapshot = Arc::new(InventorySnapshot::new(records));
                let mut state = self.state.write().await;
                state.snapshot = Arc::clone(&snapshot);
                state.refreshed_at = Some(Instant::now());
                tracing::debug!(units = snapshot.records().len(), "inventory snapshot refreshed");
                snapshot
            }
            Err(error) => {
                tracing::warn!(%error, "inventory refresh failed, serving last-known snapshot");
                Arc::clone(&self.state.read().await.snapshot)
            }
        }
    }

    /// Forces the next `get_snapshot` to refresh. Called after every
    /// successful reserve so staleness is bounded by bookings, not just time.
    pub async fn invalidate(&self) {
        self.state.write().await.refreshed_at = None;
    }

    /// Atomic check-and-set of one unit from AVAILABLE to RENTED. Racers on
    /// the same unit serialize on a per-unit mutex; different units never
    /// contend. Bypasses the snapshot entirely.
    pub async fn reserve(&self, equipment_id: &EquipmentId) -> Result<ReserveResult, LedgerError> {
        let unit_lock = self.unit_lock(equipment_id);
        let _guard = unit_lock.lock().await;

        let status = match bounded(
            self.config.reserve_timeout,
            self.ledger.read_status(equipment_id),
        )
        .await
        {
            Ok(status) => status,
            Err(LedgerError::NotFound(_)) => return Ok(ReserveResult::NotFound),
            Err(error) => return Err(error),
        };

        if status != EquipmentStatus::Available {
            tracing::info!(%equipment_id, status = status.as_str(), "reserve lost to prior booking");
            return Ok(ReserveResult::AlreadyTaken);
        }

        let swapped = bounded(
            self.config.reserve_timeout,
            self.ledger.compare_and_set_status(
                equipment_id,
                EquipmentStatus::Available,
                EquipmentStatus::Rented,
            ),
        )
        .await?;

        if !swapped {
            // An out-of-band writer beat us between read and swap.
            return Ok(ReserveResult::AlreadyTaken);
        }

        self.invalidate().await;
        tracing::info!(%equipment_id, "unit reserved");
        Ok(ReserveResult::Success)
    }

    async fn fresh_snapshot(&self) -> Option<Arc<InventorySnapshot>> {
        let state = self.state.read().await;
        match state.refreshed_at {
            Some(refreshed_at) if refreshed_at.elapsed() <= self.config.staleness => {
                Some(Arc::clone(&state.snapshot))
            }
            _ => None,
        }
    }

    fn unit_lock(&self, equipment_id: &EquipmentId) -> Arc<Mutex<()>> {
        let mut locks =
            self.reserve_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(equipment_id.clone()).or_default())
    }
}

async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout(limit)),
    }
}
