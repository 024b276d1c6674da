pub mod config;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod ledger;
pub mod negotiation;
pub mod verify;
pub mod workflow;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};
pub use domain::session::{CallOutcome, CallSession, CallStage, DeclineReason};
pub use errors::{GatewayError, LedgerError};
pub use inventory::{InventoryCache, InventoryCacheConfig, InventorySnapshot, ReserveResult};
pub use ledger::{EquipmentLedger, InMemoryLedger};
pub use negotiation::{NegotiationEngine, NegotiationOutcome};
pub use verify::{StaticVerificationGateway, VerificationGateway, VerificationResult};
pub use workflow::{CallerInput, RentalWorkflow, WorkflowConfig};
