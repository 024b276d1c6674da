//! Caller-facing adapters around the rental workflow: keyword matching of
//! free-text equipment requests, the HTTP client for the verification
//! services, and the disclosure guardrails applied to outbound text.

pub mod gateway;
pub mod guardrails;
pub mod matcher;

pub use gateway::HttpVerificationGateway;
pub use guardrails::{CustomerUnitView, DisclosureDecision, RateDisclosurePolicy};
pub use matcher::{EquipmentMatcher, KeywordMatcher, MatchCandidate};
