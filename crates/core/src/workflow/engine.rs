use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::domain::equipment::EquipmentRecord;
use crate::domain::session::{CallOutcome, CallSession, CallStage, DeclineReason};
use crate::errors::GatewayError;
use crate::inventory::{InventoryCache, ReserveResult};
use crate::negotiation::{NegotiationEngine, NegotiationOutcome};
use crate::verify::{VerificationGateway, VerificationResult};
use crate::workflow::states::CallerInput;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Bound on each remote verification call. Expiry is a gateway fault,
    /// never a verdict.
    pub verify_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { verify_timeout: Duration::from_secs(4) }
    }
}

/// Per-call driver of the seven-stage rental process. One instance serves
/// many concurrent calls; all call-scoped state lives in the `CallSession`
/// owned by `start_call`.
pub struct RentalWorkflow {
    cache: Arc<InventoryCache>,
    gateway: Arc<dyn VerificationGateway>,
    engine: NegotiationEngine,
    config: WorkflowConfig,
}

impl RentalWorkflow {
    pub fn new(
        cache: Arc<InventoryCache>,
        gateway: Arc<dyn VerificationGateway>,
        engine: NegotiationEngine,
        config: WorkflowConfig,
    ) -> Self {
        Self { cache, gateway, engine, config }
    }

    /// Drives one call to a terminal outcome. The channel closing at any
    /// point is a hangup: the call ends `Abandoned` with no inventory side
    /// effect, except that a reserve already in flight runs to completion.
    pub async fn start_call(&self, mut inputs: mpsc::Receiver<CallerInput>) -> CallSession {
        let mut session = CallSession::new();
        let mut selected_record: Option<EquipmentRecord> = None;
        let mut pending_counter: Option<Decimal> = None;
        let mut carryover_offer: Option<Decimal> = None;

        tracing::info!(call_id = %session.call_id, "rental call started");

        while !session.is_terminal() {
            let Some(input) = inputs.recv().await else {
                session.outcome = Some(CallOutcome::Abandoned);
                break;
            };
            tracing::debug!(
                call_id = %session.call_id,
                stage = session.stage.as_str(),
                input = input.kind(),
                "caller input"
            );

            if matches!(input, CallerInput::Hangup) {
                session.outcome = Some(CallOutcome::Abandoned);
                break;
            }

            match (session.stage, input) {
                (CallStage::CustomerVerification, CallerInput::LicenseNumber { value }) => {
                    session.customer_license = Some(value.clone());
                    self.run_verification(
                        &mut session,
                        CallStage::EquipmentDiscovery,
                        self.gateway.verify_business_license(&value),
                    )
                    .await;
                }

                (CallStage::EquipmentDiscovery, CallerInput::SelectEquipment { equipment_id }) => {
                    let snapshot = self.cache.get_snapshot().await;
                    let candidate = snapshot
                        .available_excluding(&session.excluded_units)
                        .into_iter()
                        .find(|record| record.equipment_id == equipment_id)
                        .cloned();
                    match candidate {
                        Some(record) => {
                            session.selected_equipment = Some(record.equipment_id.clone());
                            selected_record = Some(record);
                            session.stage = CallStage::RequirementsConfirmation;
                        }
                        None => {
                            // Not offered (taken, excluded, or unknown): the
                            // caller picks again from the remaining list.
                            tracing::info!(
                                call_id = %session.call_id,
                                %equipment_id,
                                "selection not in offered set, re-prompting"
                            );
                        }
                    }
                }
                (CallStage::EquipmentDiscovery, CallerInput::NoSelection) => {
                    session.outcome = Some(CallOutcome::Abandoned);
                }

                (CallStage::RequirementsConfirmation, CallerInput::JobAddress { value }) => {
                    let Some(record) = selected_record.as_ref() else {
                        continue;
                    };
                    session.job_address = Some(value.clone());
                    let passed = self
                        .run_verification(
                            &mut session,
                            CallStage::PricingNegotiation,
                            self.gateway.verify_site_safety(
                                &value,
                                &record.category,
                                &record.weight_class,
                            ),
                        )
                        .await;
                    if passed {
                        if let Some(offer) = carryover_offer.take() {
                            self.replay_carryover(&mut session, record, offer, &mut pending_counter);
                        }
                    }
                }

                (CallStage::PricingNegotiation, CallerInput::PriceOffer { amount }) => {
                    let Some(record) = selected_record.as_ref() else {
                        continue;
                    };
                    match self.engine.negotiate(
                        record.daily_rate,
                        record.max_rate,
                        amount,
                        session.negotiation_attempts,
                    ) {
                        NegotiationOutcome::Accepted(rate) => {
                            session.negotiated_rate = Some(rate);
                            session.stage = CallStage::OperatorCertification;
                        }
                        NegotiationOutcome::Countered(rate) => {
                            session.negotiation_attempts += 1;
                            pending_counter = Some(rate);
                        }
                        NegotiationOutcome::Rejected => {
                            session.outcome = Some(CallOutcome::Declined {
                                reason: DeclineReason::NegotiationRejected { final_offer: amount },
                            });
                        }
                    }
                }
                (CallStage::PricingNegotiation, CallerInput::AcceptCounter) => {
                    if let Some(rate) = pending_counter.take() {
                        session.negotiated_rate = Some(rate);
                        session.stage = CallStage::OperatorCertification;
                    }
                }

                (CallStage::OperatorCertification, CallerInput::OperatorLicense { value }) => {
                    let Some(record) = selected_record.as_ref() else {
                        continue;
                    };
                    session.operator_license = Some(value.clone());
                    self.run_verification(
                        &mut session,
                        CallStage::InsuranceVerification,
                        self.gateway
                            .verify_operator_credentials(&value, &record.operator_cert_required),
                    )
                    .await;
                }

                (CallStage::InsuranceVerification, CallerInput::InsurancePolicy { value }) => {
                    let Some(record) = selected_record.clone() else {
                        continue;
                    };
                    session.insurance_policy = Some(value.clone());
                    let passed = self
                        .run_verification(
                            &mut session,
                            CallStage::BookingCompletion,
                            self.gateway.verify_insurance_coverage(
                                &value,
                                record.min_insurance,
                                record.estimated_value(),
                            ),
                        )
                        .await;
                    if passed {
                        // Stage 7 needs nothing further from the caller.
                        self.complete_booking(
                            &mut session,
                            &record,
                            &mut selected_record,
                            &mut pending_counter,
                            &mut carryover_offer,
                        )
                        .await;
                    }
                }

                (stage, input) => {
                    tracing::debug!(
                        call_id = %session.call_id,
                        stage = stage.as_str(),
                        input = input.kind(),
                        "input not usable in this stage, ignoring"
                    );
                }
            }
        }

        let outcome = session.outcome.clone().unwrap_or(CallOutcome::Abandoned);
        session.outcome = Some(outcome.clone());
        tracing::info!(call_id = %session.call_id, ?outcome, "rental call ended");
        session
    }

    /// Runs one timeout-bounded verification. Pass advances to `next`; a
    /// negative verdict or a gateway fault ends the call declined, on the
    /// matching branch of the failure taxonomy. Returns whether the stage
    /// advanced.
    async fn run_verification<F>(
        &self,
        session: &mut CallSession,
        next: CallStage,
        check: F,
    ) -> bool
    where
        F: Future<Output = Result<VerificationResult, GatewayError>>,
    {
        let stage = session.stage;
        let outcome = match tokio::time::timeout(self.config.verify_timeout, check).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.verify_timeout)),
        };

        match outcome {
            Ok(result) => {
                session.record_verification(stage, result.clone());
                if result.passed {
                    session.stage = next;
                    true
                } else {
                    session.outcome = Some(CallOutcome::Declined {
                        reason: DeclineReason::VerificationFailed {
                            stage,
                            detail: result.reason,
                        },
                    });
                    false
                }
            }
            Err(error) => {
                tracing::warn!(
                    call_id = %session.call_id,
                    stage = stage.as_str(),
                    %error,
                    "verification gateway fault"
                );
                session.outcome = Some(CallOutcome::Declined {
                    reason: DeclineReason::GatewayUnavailable { stage },
                });
                false
            }
        }
    }

    /// A rate agreed for a contested unit carries into the replacement as
    /// the caller's opening offer, capped by what they already agreed to
    /// pay. Carryover never outlives the call.
    fn replay_carryover(
        &self,
        session: &mut CallSession,
        record: &EquipmentRecord,
        offer: Decimal,
        pending_counter: &mut Option<Decimal>,
    ) {
        match self.engine.negotiate(record.daily_rate, record.max_rate, offer, 0) {
            NegotiationOutcome::Accepted(rate) => {
                session.negotiated_rate = Some(rate.min(offer));
                session.stage = CallStage::OperatorCertification;
            }
            NegotiationOutcome::Countered(rate) => {
                session.negotiation_attempts = 1;
                *pending_counter = Some(rate);
            }
            NegotiationOutcome::Rejected => {
                session.outcome = Some(CallOutcome::Declined {
                    reason: DeclineReason::NegotiationRejected { final_offer: offer },
                });
            }
        }
    }

    async fn complete_booking(
        &self,
        session: &mut CallSession,
        record: &EquipmentRecord,
        selected_record: &mut Option<EquipmentRecord>,
        pending_counter: &mut Option<Decimal>,
        carryover_offer: &mut Option<Decimal>,
    ) {
        match self.cache.reserve(&record.equipment_id).await {
            Ok(ReserveResult::Success) => {
                session.outcome = Some(CallOutcome::Booked {
                    equipment_id: record.equipment_id.clone(),
                    negotiated_rate: session.negotiated_rate.unwrap_or(record.daily_rate),
                    storage_location: record.storage_location.clone(),
                });
            }
            Ok(ReserveResult::AlreadyTaken) => {
                tracing::info!(
                    call_id = %session.call_id,
                    equipment_id = %record.equipment_id,
                    "unit taken by a concurrent call, re-entering discovery"
                );
                session.excluded_units.insert(record.equipment_id.clone());
                *carryover_offer = session.negotiated_rate.take();
                session.selected_equipment = None;
                session.negotiation_attempts = 0;
                *selected_record = None;
                *pending_counter = None;
                session.stage = CallStage::EquipmentDiscovery;
            }
            Ok(ReserveResult::NotFound) => {
                tracing::error!(
                    call_id = %session.call_id,
                    equipment_id = %record.equipment_id,
                    "selected unit vanished from ledger before booking"
                );
                session.outcome = Some(CallOutcome::Declined {
                    reason: DeclineReason::DataIntegrity {
                        equipment_id: record.equipment_id.clone(),
                    },
                });
            }
            Err(error) => {
                tracing::warn!(
                    call_id = %session.call_id,
                    equipment_id = %record.equipment_id,
                    %error,
                    "ledger fault during booking"
                );
                session.outcome = Some(CallOutcome::Declined {
                    reason: DeclineReason::GatewayUnavailable {
                        stage: CallStage::BookingCompletion,
                    },
                });
            }
        }
    }
}
