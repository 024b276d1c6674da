use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use rentline_core::errors::GatewayError;
use rentline_core::verify::{VerificationGateway, VerificationResult};

/// Client for the remote verification service bundle. All four checks share
/// one endpoint shape: a JSON POST answered by a verdict document.
pub struct HttpVerificationGateway {
    client: Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct BusinessLicenseRequest<'a> {
    license_number: &'a str,
}

#[derive(Debug, Serialize)]
struct OperatorCredentialsRequest<'a> {
    operator_license: &'a str,
    certification_type: &'a str,
}

#[derive(Debug, Serialize)]
struct SiteSafetyRequest<'a> {
    job_address: &'a str,
    category: &'a str,
    weight_class: &'a str,
}

#[derive(Debug, Serialize)]
struct InsuranceCoverageRequest<'a> {
    policy_number: &'a str,
    required_amount: Decimal,
    equipment_value: Decimal,
}

#[derive(Debug, Deserialize)]
struct VerdictResponse {
    passed: bool,
    #[serde(default)]
    reason: String,
}

impl HttpVerificationGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Remote(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    async fn post_verdict<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<VerificationResult, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "verification request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Remote(format!("verification service returned {status}")));
        }

        let verdict: VerdictResponse =
            response.json().await.map_err(|error| self.classify(error))?;
        Ok(VerificationResult { passed: verdict.passed, reason: verdict.reason })
    }

    fn classify(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.timeout)
        } else {
            GatewayError::Remote(error.to_string())
        }
    }
}

#[async_trait]
impl VerificationGateway for HttpVerificationGateway {
    async fn verify_business_license(
        &self,
        license_number: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.post_verdict("/v1/verify/business-license", &BusinessLicenseRequest { license_number })
            .await
    }

    async fn verify_operator_credentials(
        &self,
        operator_license: &str,
        certification_type: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.post_verdict(
            "/v1/verify/operator-credentials",
            &OperatorCredentialsRequest { operator_license, certification_type },
        )
        .await
    }

    async fn verify_site_safety(
        &self,
        job_address: &str,
        category: &str,
        weight_class: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.post_verdict(
            "/v1/verify/site-safety",
            &SiteSafetyRequest { job_address, category, weight_class },
        )
        .await
    }

    async fn verify_insurance_coverage(
        &self,
        policy_number: &str,
        required_amount: Decimal,
        equipment_value: Decimal,
    ) -> Result<VerificationResult, GatewayError> {
        self.post_verdict(
            "/v1/verify/insurance-coverage",
            &InsuranceCoverageRequest { policy_number, required_amount, equipment_value },
        )
        .await
    }
}
