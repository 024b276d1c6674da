use serde_json::json;

use rentline_core::config::{AppConfig, LoadOptions};
use rentline_core::ledger::EquipmentLedger;
use rentline_db::{connect, SqlEquipmentLedger};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "fleet",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "fleet",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.ledger)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let records = SqlEquipmentLedger::new(pool.clone())
            .read_all()
            .await
            .map_err(|error| ("ledger_read", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(records)
    });

    match result {
        Ok(records) => {
            let available = records.iter().filter(|record| record.is_available()).count();
            let units: Vec<_> = records
                .iter()
                .map(|record| {
                    json!({
                        "equipment_id": record.equipment_id,
                        "name": record.name,
                        "category": record.category,
                        "status": record.status,
                        "daily_rate": record.daily_rate,
                        "storage_location": record.storage_location,
                        "weight_class": record.weight_class,
                    })
                })
                .collect();

            CommandResult::success_with_details(
                "fleet",
                format!("{} units on the ledger, {available} available", records.len()),
                json!({ "units": units }),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("fleet", error_class, message, exit_code)
        }
    }
}
