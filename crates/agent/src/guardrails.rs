use rust_decimal::Decimal;
use serde::Serialize;

use rentline_core::domain::equipment::EquipmentRecord;

/// The subset of an equipment row a caller may ever hear. The negotiation
/// ceiling stays internal; quoting it would hand every caller the maximum
/// discount.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerUnitView {
    pub equipment_id: String,
    pub name: String,
    pub category: String,
    pub daily_rate: Decimal,
    pub operator_cert_required: String,
    pub min_insurance: Decimal,
    pub storage_location: String,
    pub weight_class: String,
}

impl From<&EquipmentRecord> for CustomerUnitView {
    fn from(record: &EquipmentRecord) -> Self {
        Self {
            equipment_id: record.equipment_id.to_string(),
            name: record.name.clone(),
            category: record.category.clone(),
            daily_rate: record.daily_rate,
            operator_cert_required: record.operator_cert_required.clone(),
            min_insurance: record.min_insurance,
            storage_location: record.storage_location.clone(),
            weight_class: record.weight_class.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisclosureDecision {
    Allow,
    Block { reason_code: &'static str },
}

/// Outbound-text check applied before any generated line is spoken.
#[derive(Debug, Default)]
pub struct RateDisclosurePolicy;

impl RateDisclosurePolicy {
    /// Blocks text that quotes the internal ceiling for a unit whose ceiling
    /// differs from its listed rate. The listed rate itself is public.
    pub fn review(&self, text: &str, record: &EquipmentRecord) -> DisclosureDecision {
        if record.max_rate == record.daily_rate {
            return DisclosureDecision::Allow;
        }

        if contains_amount(text, record.max_rate) {
            return DisclosureDecision::Block { reason_code: "internal_ceiling_disclosed" };
        }

        DisclosureDecision::Allow
    }
}

/// Looks for the amount in the forms callers would hear it: bare, comma
/// grouped, or with cents.
fn contains_amount(text: &str, amount: Decimal) -> bool {
    let plain = amount.normalize().to_string();
    let with_cents = format!("{:.2}", amount);
    let grouped = group_thousands(&plain);

    let digits_only: String =
        text.chars().filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',').collect();

    for needle in [plain.as_str(), with_cents.as_str(), grouped.as_str()] {
        if text.contains(needle) || digits_only.contains(needle) {
            return true;
        }
    }
    false
}

fn group_thousands(plain: &str) -> String {
    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain, None),
    };

    let mut grouped = String::new();
    for (index, ch) in integer.chars().enumerate() {
        let remaining = integer.len() - index;
        if index > 0 && remaining % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use rentline_core::domain::equipment::{EquipmentId, EquipmentRecord, EquipmentStatus};

    use super::{CustomerUnitView, DisclosureDecision, RateDisclosurePolicy};

    fn excavator(daily: i64, max: i64) -> EquipmentRecord {
        EquipmentRecord {
            equipment_id: EquipmentId::from("EQ008"),
            name: "CAT 320 Excavator".to_string(),
            category: "Excavator".to_string(),
            daily_rate: Decimal::from(daily),
            max_rate: Decimal::from(max),
            status: EquipmentStatus::Available,
            operator_cert_required: "Heavy Equipment".to_string(),
            min_insurance: Decimal::from(1_000_000),
            storage_location: "Yard A".to_string(),
            weight_class: "20-25 tons".to_string(),
        }
    }

    #[test]
    fn customer_view_serializes_without_the_ceiling() {
        let view = CustomerUnitView::from(&excavator(2200, 2600));
        let json = serde_json::to_string(&view).expect("serialize");
        assert!(json.contains("2200"));
        assert!(!json.contains("max_rate"));
        assert!(!json.contains("2600"));
    }

    #[test]
    fn quoting_the_ceiling_is_blocked() {
        let policy = RateDisclosurePolicy;
        let record = excavator(2200, 2600);

        let decision = policy.review("I can go as high as $2600 per day.", &record);
        assert_eq!(
            decision,
            DisclosureDecision::Block { reason_code: "internal_ceiling_disclosed" }
        );

        let grouped = policy.review("the absolute limit is 2,600", &record);
        assert!(matches!(grouped, DisclosureDecision::Block { .. }));
    }

    #[test]
    fn quoting_the_listed_rate_is_allowed() {
        let policy = RateDisclosurePolicy;
        let record = excavator(2200, 2600);

        let decision = policy.review("The daily rate is $2200.", &record);
        assert_eq!(decision, DisclosureDecision::Allow);
    }

    #[test]
    fn units_with_no_headroom_may_state_their_rate() {
        let policy = RateDisclosurePolicy;
        let record = excavator(3200, 3200);

        // Listed rate and ceiling coincide, so saying it reveals nothing.
        let decision = policy.review("That one is firm at $3200 per day.", &record);
        assert_eq!(decision, DisclosureDecision::Allow);
    }
}
