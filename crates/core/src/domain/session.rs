use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::equipment::EquipmentId;
use crate::verify::VerificationResult;

/// The seven forced-order stages of a rental call. No skipping, no backward
/// transition except re-entering discovery after a contested booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStage {
    CustomerVerification,
    EquipmentDiscovery,
    RequirementsConfirmation,
    PricingNegotiation,
    OperatorCertification,
    InsuranceVerification,
    BookingCompletion,
}

impl CallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerVerification => "customer_verification",
            Self::EquipmentDiscovery => "equipment_discovery",
            Self::RequirementsConfirmation => "requirements_confirmation",
            Self::PricingNegotiation => "pricing_negotiation",
            Self::OperatorCertification => "operator_certification",
            Self::InsuranceVerification => "insurance_verification",
            Self::BookingCompletion => "booking_completion",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CallOutcome {
    Booked { equipment_id: EquipmentId, negotiated_rate: Decimal, storage_location: String },
    Declined { reason: DeclineReason },
    Abandoned,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DeclineReason {
    /// A verification legitimately did not pass. Never retried automatically.
    VerificationFailed { stage: CallStage, detail: String },
    /// The customer's final offer stayed below the listed daily rate.
    NegotiationRejected { final_offer: Decimal },
    /// A collaborator timed out or errored. Distinct from a negative result.
    GatewayUnavailable { stage: CallStage },
    /// The selected unit vanished between discovery and booking.
    DataIntegrity { equipment_id: EquipmentId },
}

impl DeclineReason {
    /// What the caller hears. Collaborator faults must never read as a
    /// verification verdict.
    pub fn caller_message(&self) -> String {
        match self {
            Self::VerificationFailed { detail, .. } => detail.clone(),
            Self::NegotiationRejected { final_offer } => format!(
                "We could not agree on a rate; the final offer of {final_offer} is below our listed rate."
            ),
            Self::GatewayUnavailable { .. } => {
                "We are unable to verify your details right now. Please try again later."
                    .to_string()
            }
            Self::DataIntegrity { equipment_id } => format!(
                "Unit {equipment_id} is no longer in our records; an operator will follow up."
            ),
        }
    }
}

/// Per-call mutable state. Created when the call begins, owned by the
/// workflow, dropped when the call ends. Never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: Uuid,
    pub stage: CallStage,
    pub customer_license: Option<String>,
    pub selected_equipment: Option<EquipmentId>,
    pub job_address: Option<String>,
    pub operator_license: Option<String>,
    pub insurance_policy: Option<String>,
    pub negotiated_rate: Option<Decimal>,
    pub negotiation_attempts: u32,
    pub verifications: BTreeMap<CallStage, VerificationResult>,
    pub excluded_units: BTreeSet<EquipmentId>,
    pub outcome: Option<CallOutcome>,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            stage: CallStage::CustomerVerification,
            customer_license: None,
            selected_equipment: None,
            job_address: None,
            operator_license: None,
            insurance_policy: None,
            negotiated_rate: None,
            negotiation_attempts: 0,
            verifications: BTreeMap::new(),
            excluded_units: BTreeSet::new(),
            outcome: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn record_verification(&mut self, stage: CallStage, result: VerificationResult) {
        self.verifications.insert(stage, result);
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CallOutcome, CallSession, CallStage, DeclineReason};
    use crate::domain::equipment::EquipmentId;
    use crate::verify::VerificationResult;

    #[test]
    fn new_session_starts_at_customer_verification() {
        let session = CallSession::new();
        assert_eq!(session.stage, CallStage::CustomerVerification);
        assert!(!session.is_terminal());
        assert!(session.excluded_units.is_empty());
    }

    #[test]
    fn session_becomes_terminal_once_outcome_is_set() {
        let mut session = CallSession::new();
        session.outcome = Some(CallOutcome::Abandoned);
        assert!(session.is_terminal());
    }

    #[test]
    fn gateway_fault_message_never_sounds_like_a_verdict() {
        let reason = DeclineReason::GatewayUnavailable { stage: CallStage::CustomerVerification };
        let message = reason.caller_message();
        assert!(message.contains("unable to verify"));
        assert!(!message.to_ascii_lowercase().contains("failed"));
    }

    #[test]
    fn verification_results_are_kept_per_stage() {
        let mut session = CallSession::new();
        session.record_verification(
            CallStage::CustomerVerification,
            VerificationResult::pass("license verified"),
        );
        session.record_verification(
            CallStage::RequirementsConfirmation,
            VerificationResult::fail("site cannot bear the load"),
        );
        assert_eq!(session.verifications.len(), 2);
        assert!(session.verifications[&CallStage::CustomerVerification].passed);
    }

    #[test]
    fn negotiation_rejection_quotes_the_final_offer() {
        let reason = DeclineReason::NegotiationRejected { final_offer: Decimal::from(1800) };
        assert!(reason.caller_message().contains("1800"));
        let _ = DeclineReason::DataIntegrity { equipment_id: EquipmentId::from("EQ004") };
    }
}
