use std::time::Duration;

use thiserror::Error;

use crate::domain::equipment::EquipmentId;

/// Faults from the authoritative equipment store. These are collaborator
/// faults in the call taxonomy: logged, surfaced as "unable right now",
/// never coerced into a business verdict.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger backend error: {0}")]
    Backend(String),
    #[error("ledger call exceeded {0:?}")]
    Timeout(Duration),
    #[error("equipment {0} not present in ledger")]
    NotFound(EquipmentId),
}

/// Faults from a remote verification service. Distinct from a negative
/// `VerificationResult`: a timeout is not a failed check.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("verification backend error: {0}")]
    Remote(String),
    #[error("verification call exceeded {0:?}")]
    Timeout(Duration),
}
