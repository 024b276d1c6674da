use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "rate")]
pub enum NegotiationOutcome {
    /// The offer clears the listed rate; close at the offer, never above it.
    Accepted(Decimal),
    /// A counter strictly inside the negotiation room, shrinking toward the
    /// listed rate as attempts accumulate.
    Countered(Decimal),
    Rejected,
}

/// Stateless bounded-price policy for one equipment record. Attempt history
/// lives in the call session; the engine only needs the count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegotiationEngine {
    max_attempts: u32,
}

impl NegotiationEngine {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Invariant: every returned rate satisfies `daily_rate <= rate <= max_rate`.
    pub fn negotiate(
        &self,
        daily_rate: Decimal,
        max_rate: Decimal,
        customer_offer: Decimal,
        attempt_count: u32,
    ) -> NegotiationOutcome {
        // Records are validated upstream; a malformed row gets no room.
        let ceiling = max_rate.max(daily_rate);

        if customer_offer >= daily_rate {
            let rate = customer_offer.min(ceiling);
            return NegotiationOutcome::Accepted(rate);
        }

        // No room to move: a below-rate offer is dead on arrival.
        if ceiling == daily_rate {
            return NegotiationOutcome::Rejected;
        }

        if attempt_count >= self.max_attempts {
            return NegotiationOutcome::Rejected;
        }

        let room = ceiling - daily_rate;
        let counter = daily_rate + room * decay(attempt_count);
        NegotiationOutcome::Countered(counter.round_dp(2))
    }
}

impl Default for NegotiationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Halving decay: 1/2, 1/4, 1/8, ... Strictly decreasing toward zero, so
/// counters walk down from the midpoint toward the listed rate.
fn decay(attempt_count: u32) -> Decimal {
    let shift = attempt_count.saturating_add(1).min(32);
    Decimal::ONE / Decimal::from(2u64.pow(shift))
}
