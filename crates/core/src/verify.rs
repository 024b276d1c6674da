use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// Business verdict of a single verification check. Consumed once by the
/// workflow, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub reason: String,
}

impl VerificationResult {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self { passed: true, reason: reason.into() }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self { passed: false, reason: reason.into() }
    }
}

/// Uniform interface to the four external verification checks. Each call is
/// idempotent and side-effect-free on the inventory. A transport failure is
/// an `Err`, never a `VerificationResult`; callers own any retry policy.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn verify_business_license(
        &self,
        license_number: &str,
    ) -> Result<VerificationResult, GatewayError>;

    async fn verify_operator_credentials(
        &self,
        operator_license: &str,
        certification_type: &str,
    ) -> Result<VerificationResult, GatewayError>;

    async fn verify_site_safety(
        &self,
        job_address: &str,
        category: &str,
        weight_class: &str,
    ) -> Result<VerificationResult, GatewayError>;

    async fn verify_insurance_coverage(
        &self,
        policy_number: &str,
        required_amount: Decimal,
        equipment_value: Decimal,
    ) -> Result<VerificationResult, GatewayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerificationCheck {
    BusinessLicense,
    OperatorCredentials,
    SiteSafety,
    InsuranceCoverage,
}

/// Scripted per-check behavior for the static gateway.
#[derive(Clone, Debug)]
pub enum CheckBehavior {
    Pass,
    Fail(String),
    Error(GatewayError),
    /// Respond after a delay; the workflow's timeout wrapper decides whether
    /// the caller ever sees the verdict.
    DelayThenPass(Duration),
}

/// Pass-everything stub with injectable denials and faults. Stands in for
/// the real verification services in tests and `rentline simulate`.
#[derive(Clone, Debug, Default)]
pub struct StaticVerificationGateway {
    behaviors: BTreeMap<VerificationCheck, CheckBehavior>,
}

impl StaticVerificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, check: VerificationCheck, behavior: CheckBehavior) -> Self {
        self.behaviors.insert(check, behavior);
        self
    }

    async fn respond(
        &self,
        check: VerificationCheck,
        pass_reason: String,
    ) -> Result<VerificationResult, GatewayError> {
        match self.behaviors.get(&check) {
            None | Some(CheckBehavior::Pass) => Ok(VerificationResult::pass(pass_reason)),
            Some(CheckBehavior::Fail(reason)) => Ok(VerificationResult::fail(reason.clone())),
            Some(CheckBehavior::Error(error)) => Err(error.clone()),
            Some(CheckBehavior::DelayThenPass(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(VerificationResult::pass(pass_reason))
            }
        }
    }
}

#[async_trait]
impl VerificationGateway for StaticVerificationGateway {
    async fn verify_business_license(
        &self,
        license_number: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.respond(
            VerificationCheck::BusinessLicense,
            format!("business license {license_number} verified"),
        )
        .await
    }

    async fn verify_operator_credentials(
        &self,
        operator_license: &str,
        certification_type: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.respond(
            VerificationCheck::OperatorCredentials,
            format!("operator {operator_license} certified for {certification_type}"),
        )
        .await
    }

    async fn verify_site_safety(
        &self,
        job_address: &str,
        category: &str,
        weight_class: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.respond(
            VerificationCheck::SiteSafety,
            format!("site {job_address} cleared for {category} ({weight_class})"),
        )
        .await
    }

    async fn verify_insurance_coverage(
        &self,
        policy_number: &str,
        required_amount: Decimal,
        _equipment_value: Decimal,
    ) -> Result<VerificationResult, GatewayError> {
        self.respond(
            VerificationCheck::InsuranceCoverage,
            format!("policy {policy_number} meets required coverage of {required_amount}"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        CheckBehavior, StaticVerificationGateway, VerificationCheck, VerificationGateway,
    };
    use crate::errors::GatewayError;

    #[tokio::test]
    async fn stub_passes_every_check_by_default() {
        let gateway = StaticVerificationGateway::new();
        assert!(gateway.verify_business_license("BL-1001").await.expect("license").passed);
        assert!(gateway
            .verify_operator_credentials("OP-77", "Heavy Equipment")
            .await
            .expect("operator")
            .passed);
        assert!(gateway
            .verify_site_safety("12 Dock Rd", "Excavator", "20-25 tons")
            .await
            .expect("site")
            .passed);
        assert!(gateway
            .verify_insurance_coverage("POL-9", Decimal::from(1_000_000), Decimal::from(66_000))
            .await
            .expect("insurance")
            .passed);
    }

    #[tokio::test]
    async fn scripted_denial_is_a_verdict_not_an_error() {
        let gateway = StaticVerificationGateway::new().with_behavior(
            VerificationCheck::SiteSafety,
            CheckBehavior::Fail("access road rated below weight class".to_string()),
        );
        let result =
            gateway.verify_site_safety("1 Bog Ln", "Crane", "40+ tons").await.expect("verdict");
        assert!(!result.passed);
        assert!(result.reason.contains("access road"));
    }

    #[tokio::test]
    async fn scripted_fault_surfaces_as_gateway_error() {
        let gateway = StaticVerificationGateway::new().with_behavior(
            VerificationCheck::BusinessLicense,
            CheckBehavior::Error(GatewayError::Remote("upstream 503".to_string())),
        );
        let error = gateway.verify_business_license("BL-1").await.expect_err("fault");
        assert_eq!(error, GatewayError::Remote("upstream 503".to_string()));
    }
}
