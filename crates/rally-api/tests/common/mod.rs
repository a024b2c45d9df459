#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use rally_api::payments::provider::{
    InitializeTransaction, InitializedTransaction, PaymentProvider, ProviderError,
    VerifiedTransaction,
};
use rally_api::{AppState, AppStateInner};
use rally_db::Database;

pub const SECRET: &str = "test-secret";
pub const PASSWORD: &str = "hunter22hunter";

/// What the fake provider answers to the next `verify` call.
#[derive(Debug, Clone, Copy)]
pub enum VerifyOutcome {
    Success,
    /// Provider reports success but settled less than the fee.
    Underpaid,
    Failed,
    Unreachable,
}

pub struct FakeProvider {
    pub verify: Mutex<VerifyOutcome>,
    pub initialized: Mutex<Vec<InitializeTransaction>>,
    pub down: Mutex<bool>,
}

impl FakeProvider {
    pub fn set_verify(&self, outcome: VerifyOutcome) {
        *self.verify.lock().unwrap() = outcome;
    }
}

struct SharedProvider(Arc<FakeProvider>);

#[async_trait]
impl PaymentProvider for SharedProvider {
    async fn initialize(
        &self,
        req: &InitializeTransaction,
    ) -> Result<InitializedTransaction, ProviderError> {
        if *self.0.down.lock().unwrap() {
            return Err(ProviderError::Rejected("connection refused".into()));
        }
        self.0.initialized.lock().unwrap().push(req.clone());
        Ok(InitializedTransaction {
            reference: req.reference.clone(),
            authorization_url: format!("https://checkout.test/{}", req.reference),
            access_code: "ACCESS".into(),
        })
    }

    async fn verify(&self, _reference: &str) -> Result<VerifiedTransaction, ProviderError> {
        let outcome = *self.0.verify.lock().unwrap();
        match outcome {
            VerifyOutcome::Success => Ok(VerifiedTransaction {
                success: true,
                status: "success".into(),
                amount: Some(500_000),
                customer_id: Some("CUS_test".into()),
            }),
            VerifyOutcome::Underpaid => Ok(VerifiedTransaction {
                success: true,
                status: "success".into(),
                amount: Some(100),
                customer_id: Some("CUS_test".into()),
            }),
            VerifyOutcome::Failed => Ok(VerifiedTransaction {
                success: false,
                status: "failed".into(),
                amount: None,
                customer_id: None,
            }),
            VerifyOutcome::Unreachable => Err(ProviderError::Rejected("timed out".into())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub provider: Arc<FakeProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_open_promotion(false)
    }

    pub fn with_open_promotion(open_admin_promotion: bool) -> Self {
        let provider = Arc::new(FakeProvider {
            verify: Mutex::new(VerifyOutcome::Success),
            initialized: Mutex::new(Vec::new()),
            down: Mutex::new(false),
        });
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::days(7),
            payments: Box::new(SharedProvider(provider.clone())),
            payment_public_key: "pk_test_123".into(),
            payment_callback_url: None,
            open_admin_promotion,
        });

        Self {
            router: rally_api::router(state.clone()),
            state,
            provider,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a user and return `(token, user_id)`.
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({ "email": email, "password": PASSWORD, "fullName": "Test User" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Register a user and flip their admin flag directly in the store.
    pub async fn admin(&self, email: &str) -> (String, String) {
        let (token, id) = self.register(email).await;
        self.state.db.set_admin_by_email(email, true).unwrap();
        (token, id)
    }

    pub async fn participate(&self, token: Option<&str>) -> String {
        let (status, body) = self.post("/submissions/participate", token, participation()).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

pub fn participation() -> Value {
    json!({
        "fullName": "Ada Obi",
        "email": "ada@x.com",
        "phone": "08030000000",
        "bankName": "First Bank",
        "accountNumber": "0123456789",
        "accountName": "Ada Obi",
        "state": "Lagos",
        "interests": ["youth", " ", "media"]
    })
}
