use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::equipment::EquipmentId;

/// One caller utterance, already reduced to structure by the external
/// speech/NLP layer. The workflow never sees raw audio or free text;
/// equipment matching happens outside and arrives as a selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "input")]
pub enum CallerInput {
    LicenseNumber { value: String },
    SelectEquipment { equipment_id: EquipmentId },
    /// The caller has exhausted the candidate list without choosing.
    NoSelection,
    JobAddress { value: String },
    PriceOffer { amount: Decimal },
    AcceptCounter,
    OperatorLicense { value: String },
    InsurancePolicy { value: String },
    Hangup,
}

impl CallerInput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LicenseNumber { .. } => "license_number",
            Self::SelectEquipment { .. } => "select_equipment",
            Self::NoSelection => "no_selection",
            Self::JobAddress { .. } => "job_address",
            Self::PriceOffer { .. } => "price_offer",
            Self::AcceptCounter => "accept_counter",
            Self::OperatorLicense { .. } => "operator_license",
            Self::InsurancePolicy { .. } => "insurance_policy",
            Self::Hangup => "hangup",
        }
    }
}
