use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};
use crate::errors::LedgerError;

/// The authoritative external store of equipment rows. Implementations must
/// provide a true compare-and-set on the status column; the inventory cache
/// layers a per-unit mutex on top for backends that cannot.
#[async_trait]
pub trait EquipmentLedger: Send + Sync {
    async fn read_all(&self) -> Result<Vec<EquipmentRecord>, LedgerError>;

    async fn read_status(&self, equipment_id: &EquipmentId)
        -> Result<EquipmentStatus, LedgerError>;

    /// Returns `true` iff the stored status equalled `expected` and was
    /// swapped to `new` in one step.
    async fn compare_and_set_status(
        &self,
        equipment_id: &EquipmentId,
        expected: EquipmentStatus,
        new: EquipmentStatus,
    ) -> Result<bool, LedgerError>;
}

/// Deterministic ledger for tests and the `simulate` command. The fail flag
/// lets staleness tests cut the backend off mid-run.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<BTreeMap<EquipmentId, EquipmentRecord>>,
    fail_reads: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(records: impl IntoIterator<Item = EquipmentRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.equipment_id.clone(), record))
            .collect::<BTreeMap<_, _>>();
        Self { records: Mutex::new(records), fail_reads: AtomicBool::new(false) }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn insert(&self, record: EquipmentRecord) {
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(record.equipment_id.clone(), record);
    }

    pub fn remove(&self, equipment_id: &EquipmentId) -> Option<EquipmentRecord> {
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.remove(equipment_id)
    }

    pub fn status_of(&self, equipment_id: &EquipmentId) -> Option<EquipmentStatus> {
        let records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records.get(equipment_id).map(|record| record.status)
    }
}

#[async_trait]
impl EquipmentLedger for InMemoryLedger {
    async fn read_all(&self) -> Result<Vec<EquipmentRecord>, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Backend("in-memory ledger offline".to_string()));
        }
        let records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.values().cloned().collect())
    }

    async fn read_status(
        &self,
        equipment_id: &EquipmentId,
    ) -> Result<EquipmentStatus, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::Backend("in-memory ledger offline".to_string()));
        }
        let records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        records
            .get(equipment_id)
            .map(|record| record.status)
            .ok_or_else(|| LedgerError::NotFound(equipment_id.clone()))
    }

    async fn compare_and_set_status(
        &self,
        equipment_id: &EquipmentId,
        expected: EquipmentStatus,
        new: EquipmentStatus,
    ) -> Result<bool, LedgerError> {
        let mut records = self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let record =
            records.get_mut(equipment_id).ok_or_else(|| LedgerError::NotFound(equipment_id.clone()))?;
        if record.status != expected {
            return Ok(false);
        }
        record.status = new;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{EquipmentLedger, InMemoryLedger};
    use crate::domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};
    use crate::errors::LedgerError;

    fn excavator(id: &str, status: EquipmentStatus) -> EquipmentRecord {
        EquipmentRecord {
            equipment_id: EquipmentId::from(id),
            name: format!("Excavator {id}"),
            category: "Excavator".to_string(),
            daily_rate: Decimal::from(2200),
            max_rate: Decimal::from(2600),
            status,
            operator_cert_required: "Heavy Equipment".to_string(),
            min_insurance: Decimal::from(1_000_000),
            storage_location: "Yard A".to_string(),
            weight_class: "20-25 tons".to_string(),
        }
    }

    #[tokio::test]
    async fn compare_and_set_swaps_only_from_expected_status() {
        let ledger = InMemoryLedger::new([excavator("EQ001", EquipmentStatus::Available)]);
        let id = EquipmentId::from("EQ001");

        let swapped = ledger
            .compare_and_set_status(&id, EquipmentStatus::Available, EquipmentStatus::Rented)
            .await
            .expect("cas");
        assert!(swapped);
        assert_eq!(ledger.status_of(&id), Some(EquipmentStatus::Rented));

        let swapped_again = ledger
            .compare_and_set_status(&id, EquipmentStatus::Available, EquipmentStatus::Rented)
            .await
            .expect("cas");
        assert!(!swapped_again);
    }

    #[tokio::test]
    async fn unknown_unit_reads_as_not_found() {
        let ledger = InMemoryLedger::new([]);
        let error =
            ledger.read_status(&EquipmentId::from("EQ404")).await.expect_err("missing unit");
        assert!(matches!(error, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_flag_cuts_off_reads_but_not_writes() {
        let ledger = InMemoryLedger::new([excavator("EQ002", EquipmentStatus::Available)]);
        ledger.set_fail_reads(true);

        assert!(ledger.read_all().await.is_err());
        let swapped = ledger
            .compare_and_set_status(
                &EquipmentId::from("EQ002"),
                EquipmentStatus::Available,
                EquipmentStatus::Maintenance,
            )
            .await
            .expect("cas still works");
        assert!(swapped);
    }
}
