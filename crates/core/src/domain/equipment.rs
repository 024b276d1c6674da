use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EquipmentId(pub String);

impl std::fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EquipmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
    Available,
    Rented,
    Maintenance,
    Reserved,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Rented => "RENTED",
            Self::Maintenance => "MAINTENANCE",
            Self::Reserved => "RESERVED",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown equipment status `{0}` (expected AVAILABLE|RENTED|MAINTENANCE|RESERVED)")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for EquipmentStatus {
    type Err = ParseStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "RENTED" => Ok(Self::Rented),
            "MAINTENANCE" => Ok(Self::Maintenance),
            "RESERVED" => Ok(Self::Reserved),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub equipment_id: EquipmentId,
    pub name: String,
    pub category: String,
    pub daily_rate: Decimal,
    pub max_rate: Decimal,
    pub status: EquipmentStatus,
    pub operator_cert_required: String,
    pub min_insurance: Decimal,
    pub storage_location: String,
    pub weight_class: String,
}

impl EquipmentRecord {
    /// The ledger owns record creation; this only rejects rows that would
    /// break the pricing invariant the negotiation engine depends on.
    pub fn validate(&self) -> Result<(), EquipmentRecordError> {
        if self.daily_rate > self.max_rate {
            return Err(EquipmentRecordError::InvertedRates {
                equipment_id: self.equipment_id.clone(),
                daily_rate: self.daily_rate,
                max_rate: self.max_rate,
            });
        }
        if self.daily_rate < Decimal::ZERO {
            return Err(EquipmentRecordError::NegativeRate {
                equipment_id: self.equipment_id.clone(),
            });
        }
        Ok(())
    }

    /// Approximate replacement value used for insurance verification,
    /// thirty days at the listed rate.
    pub fn estimated_value(&self) -> Decimal {
        self.daily_rate * Decimal::from(30)
    }

    pub fn is_available(&self) -> bool {
        self.status == EquipmentStatus::Available
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EquipmentRecordError {
    #[error("equipment {equipment_id}: daily rate {daily_rate} exceeds max rate {max_rate}")]
    InvertedRates { equipment_id: EquipmentId, daily_rate: Decimal, max_rate: Decimal },
    #[error("equipment {equipment_id}: daily rate is negative")]
    NegativeRate { equipment_id: EquipmentId },
}
