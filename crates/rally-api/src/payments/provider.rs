//! Payment provider bridge. The HTTP client talks to a Paystack-compatible
//! API; tests swap in their own [`PaymentProvider`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_PAYSTACK_URL: &str = "https://api.paystack.co";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct InitializeTransaction {
    pub reference: String,
    pub email: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub callback_url: Option<String>,
    pub submission_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct InitializedTransaction {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    /// True only when the provider reports the charge as successful.
    pub success: bool,
    /// Raw provider status, e.g. `success`, `failed`, `abandoned`.
    pub status: String,
    pub amount: Option<i64>,
    pub customer_id: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initialize(
        &self,
        req: &InitializeTransaction,
    ) -> Result<InitializedTransaction, ProviderError>;

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, ProviderError>;
}

pub struct PaystackClient {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = resp.status();
        let envelope: Envelope<T> = resp.json().await?;
        match envelope.data {
            Some(data) if status.is_success() && envelope.status => Ok(data),
            _ => Err(ProviderError::Rejected(format!("{} ({})", envelope.message, status))),
        }
    }
}

/// Every Paystack response is wrapped as `{status, message, data}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: Option<i64>,
    customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: Option<i64>,
    customer_code: Option<String>,
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    async fn initialize(
        &self,
        req: &InitializeTransaction,
    ) -> Result<InitializedTransaction, ProviderError> {
        debug!("Initializing transaction {}", req.reference);
        let body = InitializeBody {
            email: &req.email,
            amount: req.amount,
            currency: &req.currency,
            reference: &req.reference,
            callback_url: req.callback_url.as_deref(),
            metadata: json!({ "submission_id": req.submission_id }),
        };

        let resp = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?;

        let data: InitializeData = Self::read_envelope(resp).await?;
        Ok(InitializedTransaction {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, ProviderError> {
        debug!("Verifying transaction {}", reference);
        let resp = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let data: VerifyData = Self::read_envelope(resp).await?;
        let customer_id = data
            .customer
            .and_then(|c| c.customer_code.or_else(|| c.id.map(|id| id.to_string())));

        Ok(VerifiedTransaction {
            success: data.status == "success",
            status: data.status,
            amount: data.amount,
            customer_id,
        })
    }
}
