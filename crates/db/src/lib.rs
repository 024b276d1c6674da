pub mod connection;
pub mod fixtures;
pub mod ledger;
pub mod migrations;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{seed_fleet, SeedSummary};
pub use ledger::SqlEquipmentLedger;
