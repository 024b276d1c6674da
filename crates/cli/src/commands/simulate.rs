use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::mpsc;

use rentline_agent::{EquipmentMatcher, HttpVerificationGateway, KeywordMatcher};
use rentline_core::config::{AppConfig, LoadOptions};
use rentline_core::domain::session::CallOutcome;
use rentline_core::inventory::InventoryCache;
use rentline_core::negotiation::NegotiationEngine;
use rentline_core::verify::{StaticVerificationGateway, VerificationGateway};
use rentline_core::workflow::{CallerInput, RentalWorkflow};
use rentline_db::{connect, SqlEquipmentLedger};

use crate::commands::CommandResult;

/// Drives one scripted rental call end to end against the configured ledger.
/// With no remote gateway configured every verification passes, so the run
/// exercises discovery, negotiation, and the atomic reserve.
pub fn run(description: &str, offer: Option<Decimal>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let gateway: Arc<dyn VerificationGateway> = match &config.gateway.base_url {
        Some(base_url) => {
            let Some(api_key) = config.gateway.api_key.clone() else {
                return CommandResult::failure(
                    "simulate",
                    "config_validation",
                    "gateway.base_url is set without gateway.api_key",
                    2,
                );
            };
            match HttpVerificationGateway::new(
                base_url.clone(),
                api_key,
                Duration::from_secs(config.gateway.timeout_secs),
            ) {
                Ok(gateway) => Arc::new(gateway),
                Err(error) => {
                    return CommandResult::failure(
                        "simulate",
                        "gateway_init",
                        error.to_string(),
                        3,
                    );
                }
            }
        }
        None => Arc::new(StaticVerificationGateway::new()),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
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

        let cache = Arc::new(InventoryCache::new(
            Arc::new(SqlEquipmentLedger::new(pool.clone())),
            config.inventory_cache_config(),
        ));

        let snapshot = cache.get_snapshot().await;
        if snapshot.records().is_empty() {
            pool.close().await;
            return Err((
                "empty_fleet",
                "no equipment on the ledger; run `rentline seed` first".to_string(),
                5u8,
            ));
        }

        let candidates = KeywordMatcher.rank(description, &snapshot);
        let Some(candidate) = candidates.first() else {
            pool.close().await;
            return Err((
                "no_match",
                format!("no available unit matches `{description}`"),
                6u8,
            ));
        };
        let record = candidate.record.clone();

        let workflow = RentalWorkflow::new(
            Arc::clone(&cache),
            gateway,
            NegotiationEngine::new(config.negotiation.max_attempts),
            config.workflow_config(),
        );

        let (sender, receiver) = mpsc::channel(16);
        let script = vec![
            CallerInput::LicenseNumber { value: "BL-1001".to_string() },
            CallerInput::SelectEquipment { equipment_id: record.equipment_id.clone() },
            CallerInput::JobAddress { value: "12 Dock Road".to_string() },
            CallerInput::PriceOffer { amount: offer.unwrap_or(record.daily_rate) },
            CallerInput::AcceptCounter,
            CallerInput::OperatorLicense { value: "OP-77".to_string() },
            CallerInput::InsurancePolicy { value: "POL-9".to_string() },
        ];
        for input in script {
            if sender.send(input).await.is_err() {
                break;
            }
        }
        drop(sender);

        let session = workflow.start_call(receiver).await;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((record, session))
    });

    match result {
        Ok((record, session)) => {
            let message = match &session.outcome {
                Some(CallOutcome::Booked { equipment_id, negotiated_rate, storage_location }) => {
                    format!(
                        "booked {equipment_id} at {negotiated_rate}/day, pickup at {storage_location}"
                    )
                }
                Some(CallOutcome::Declined { reason }) => {
                    format!("declined: {}", reason.caller_message())
                }
                Some(CallOutcome::Abandoned) | None => "call abandoned".to_string(),
            };

            CommandResult::success_with_details(
                "simulate",
                message,
                json!({
                    "call_id": session.call_id,
                    "matched_unit": record.equipment_id,
                    "matched_name": record.name,
                    "negotiation_attempts": session.negotiation_attempts,
                    "outcome": session.outcome,
                }),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("simulate", error_class, message, exit_code)
        }
    }
}
