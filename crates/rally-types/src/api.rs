use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PaymentStatus, SubmissionStatus, User};

// -- JWT Claims --

/// JWT claims issued by `/auth/register` and `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromoteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetAdminRequest {
    pub is_admin: bool,
}

// -- Submissions --

/// Every field is optional on the wire so that validation can report all
/// missing fields at once instead of failing on the first.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipateRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub message: Option<String>,
}

impl ParticipateRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("bankName", &self.bank_name),
            ("accountNumber", &self.account_number),
            ("accountName", &self.account_name),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl ContactRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| name)
        .collect()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: SubmissionStatus,
    pub admin_notes: Option<String>,
}

// -- Payments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitializePaymentRequest {
    pub submission_id: Uuid,
    /// Minor currency units; defaults to the configured payment amount.
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentResponse {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyPaymentRequest {
    pub reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub submission_id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub reference: String,
    pub payment_status: PaymentStatus,
    pub amount_paid: Option<i64>,
    pub provider_customer_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigResponse {
    pub public_key: String,
    pub amount: i64,
    pub currency: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePaymentSettingsRequest {
    pub amount: i64,
    pub currency: String,
    pub enabled: bool,
}

// -- Content --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertContentRequest {
    pub section: String,
    pub data: serde_json::Value,
}

// -- Blog --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub body: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
}

// -- Social media --

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaRequest {
    pub platform: String,
    pub url: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participate_reports_every_missing_field() {
        let req: ParticipateRequest =
            serde_json::from_str(r#"{"fullName":"Ada","email":"  ","bankName":"First"}"#).unwrap();
        assert_eq!(
            req.missing_fields(),
            vec!["email", "phone", "accountNumber", "accountName"]
        );
    }

    #[test]
    fn complete_contact_has_no_missing_fields() {
        let req: ContactRequest =
            serde_json::from_str(r#"{"name":"A","email":"a@x.com","message":"hi"}"#).unwrap();
        assert!(req.missing_fields().is_empty());
    }

    #[test]
    fn register_rejects_unknown_fields() {
        let res = serde_json::from_str::<RegisterRequest>(
            r#"{"email":"a@x.com","password":"pw","fullName":"A","isAdmin":true}"#,
        );
        assert!(res.is_err());
    }
}
