use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use rentline_core::domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};
use rentline_core::errors::LedgerError;
use rentline_core::ledger::EquipmentLedger;

use crate::DbPool;

/// Sqlite-backed equipment ledger. Status swaps are a single conditional
/// UPDATE, so the compare-and-set contract holds without table locks.
pub struct SqlEquipmentLedger {
    pool: DbPool,
}

impl SqlEquipmentLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(error: sqlx::Error) -> LedgerError {
    LedgerError::Backend(error.to_string())
}

fn decode_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, LedgerError> {
    let raw: String = row.try_get(column).map_err(backend)?;
    Decimal::from_str(raw.trim())
        .map_err(|_| LedgerError::Backend(format!("column `{column}` holds non-decimal `{raw}`")))
}

fn row_to_record(row: &SqliteRow) -> Result<EquipmentRecord, LedgerError> {
    let status_raw: String = row.try_get("status").map_err(backend)?;
    let status = status_raw
        .parse::<EquipmentStatus>()
        .map_err(|error| LedgerError::Backend(error.to_string()))?;

    Ok(EquipmentRecord {
        equipment_id: EquipmentId(row.try_get("equipment_id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        category: row.try_get("category").map_err(backend)?,
        daily_rate: decode_decimal(row, "daily_rate")?,
        max_rate: decode_decimal(row, "max_rate")?,
        status,
        operator_cert_required: row.try_get("operator_cert_required").map_err(backend)?,
        min_insurance: decode_decimal(row, "min_insurance")?,
        storage_location: row.try_get("storage_location").map_err(backend)?,
        weight_class: row.try_get("weight_class").map_err(backend)?,
    })
}

#[async_trait]
impl EquipmentLedger for SqlEquipmentLedger {
    async fn read_all(&self) -> Result<Vec<EquipmentRecord>, LedgerError> {
        let rows = sqlx::query(
            "SELECT equipment_id, name, category, daily_rate, max_rate, status,
                    operator_cert_required, min_insurance, storage_location, weight_class
             FROM equipment ORDER BY equipment_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn read_status(
        &self,
        equipment_id: &EquipmentId,
    ) -> Result<EquipmentStatus, LedgerError> {
        let row = sqlx::query("SELECT status FROM equipment WHERE equipment_id = ?")
            .bind(&equipment_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| LedgerError::NotFound(equipment_id.clone()))?;

        let status_raw: String = row.try_get("status").map_err(backend)?;
        status_raw.parse().map_err(|error: rentline_core::domain::equipment::ParseStatusError| {
            LedgerError::Backend(error.to_string())
        })
    }

    async fn compare_and_set_status(
        &self,
        equipment_id: &EquipmentId,
        expected: EquipmentStatus,
        new: EquipmentStatus,
    ) -> Result<bool, LedgerError> {
        let result = sqlx::query(
            "UPDATE equipment
             SET status = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE equipment_id = ? AND status = ?",
        )
        .bind(new.as_str())
        .bind(&equipment_id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            debug!(equipment_id = %equipment_id, from = expected.as_str(), to = new.as_str(), "status swapped");
            return Ok(true);
        }

        // Zero rows is either a lost race or a vanished unit; the caller
        // treats those differently.
        self.read_status(equipment_id).await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use rentline_core::domain::equipment::{EquipmentId, EquipmentStatus};
    use rentline_core::errors::LedgerError;
    use rentline_core::ledger::EquipmentLedger;

    use super::SqlEquipmentLedger;
    use crate::connect_with_settings;
    use crate::fixtures::seed_fleet;
    use crate::migrations::run_pending;

    async fn seeded_ledger() -> SqlEquipmentLedger {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        seed_fleet(&pool).await.expect("seed");
        SqlEquipmentLedger::new(pool)
    }

    #[tokio::test]
    async fn read_all_decodes_rates_as_decimals() {
        let ledger = seeded_ledger().await;
        let records = ledger.read_all().await.expect("read all");

        let excavator = records
            .iter()
            .find(|record| record.equipment_id == EquipmentId::from("EQ008"))
            .expect("EQ008 is seeded");
        assert_eq!(excavator.daily_rate, Decimal::from(2200));
        assert_eq!(excavator.max_rate, Decimal::from(2600));
        assert!(excavator.validate().is_ok());
    }

    #[tokio::test]
    async fn compare_and_set_reports_lost_race_without_error() {
        let ledger = seeded_ledger().await;
        let id = EquipmentId::from("EQ008");

        let swapped = ledger
            .compare_and_set_status(&id, EquipmentStatus::Available, EquipmentStatus::Rented)
            .await
            .expect("first cas");
        assert!(swapped);

        let swapped_again = ledger
            .compare_and_set_status(&id, EquipmentStatus::Available, EquipmentStatus::Rented)
            .await
            .expect("second cas");
        assert!(!swapped_again);
        assert_eq!(ledger.read_status(&id).await.expect("status"), EquipmentStatus::Rented);
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_unit_is_not_found() {
        let ledger = seeded_ledger().await;
        let error = ledger
            .compare_and_set_status(
                &EquipmentId::from("EQ404"),
                EquipmentStatus::Available,
                EquipmentStatus::Rented,
            )
            .await
            .expect_err("missing unit");
        assert!(matches!(error, LedgerError::NotFound(_)));
    }
}
