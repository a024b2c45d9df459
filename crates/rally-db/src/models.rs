//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the rally-types API models; `into_model` bridges the two.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use rally_types::models::{
    BlogPost, ContactSubmission, ParticipateSubmission, PaymentSettings, PaymentStatus,
    SocialMediaLink, SubmissionStatus, User,
};

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ParticipateRow {
    pub id: String,
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub interests: String,
    pub message: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub provider_customer_id: Option<String>,
    pub amount_paid: Option<i64>,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct ContactRow {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct ContentRow {
    pub section: String,
    pub data: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct BlogRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub struct SocialRow {
    pub id: String,
    pub platform: String,
    pub url: String,
    pub icon: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug)]
pub struct PaymentSettingsRow {
    pub amount: i64,
    pub currency: String,
    pub enabled: bool,
    pub updated_at: String,
}

/// One checkout handed to the provider. A submission keeps every attempt so
/// any reference it was ever issued can still be verified.
#[derive(Debug)]
pub struct PaymentAttemptRow {
    pub reference: String,
    pub submission_id: String,
    /// Minor units the checkout was opened for.
    pub amount: i64,
    pub created_at: String,
}

// -- Inserts --

#[derive(Debug)]
pub struct NewParticipate {
    pub id: String,
    pub user_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    /// JSON array text.
    pub interests: String,
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct NewContact {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct BlogFields {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
}

#[derive(Debug)]
pub struct NewSocial {
    pub id: String,
    pub platform: String,
    pub url: String,
    pub icon: Option<String>,
    pub sort_order: i64,
}

/// Result of attaching a new checkout reference to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptAdded {
    Added,
    AlreadyPaid,
    NoSuchSubmission,
}

/// Result of recording a provider verification against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentUpdate {
    Recorded,
    /// The row was already `paid`; nothing was written.
    AlreadyPaid,
    NoSuchReference,
}

// -- Conversions --

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC; fall back to RFC 3339 for rows written elsewhere.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .ok()
        .or_else(|| raw.parse::<DateTime<Utc>>().ok())
}

fn timestamp(raw: &str, field: &str, id: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on row '{}'", field, raw, id);
        DateTime::default()
    })
}

fn uuid(raw: &str, field: &str, id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, id, e);
        Uuid::default()
    })
}

fn opt_uuid(raw: Option<&str>, field: &str, id: &str) -> Option<Uuid> {
    raw.map(|v| uuid(v, field, id))
}

fn status(raw: &str, id: &str) -> SubmissionStatus {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt status on row '{}': {}", id, e);
        SubmissionStatus::Pending
    })
}

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            id: uuid(&self.id, "id", &self.id),
            created_at: timestamp(&self.created_at, "created_at", &self.id),
            email: self.email,
            full_name: self.full_name,
            is_admin: self.is_admin,
        }
    }
}

impl ParticipateRow {
    pub fn into_model(self) -> ParticipateSubmission {
        let interests = serde_json::from_str(&self.interests).unwrap_or_else(|e| {
            warn!("Corrupt interests on submission '{}': {}", self.id, e);
            Vec::new()
        });
        let payment_status = self.payment_status.parse().unwrap_or_else(|e| {
            warn!("Corrupt payment_status on submission '{}': {}", self.id, e);
            PaymentStatus::Unpaid
        });

        ParticipateSubmission {
            id: uuid(&self.id, "id", &self.id),
            user_id: opt_uuid(self.user_id.as_deref(), "user_id", &self.id),
            status: status(&self.status, &self.id),
            payment_status,
            interests,
            created_at: timestamp(&self.created_at, "created_at", &self.id),
            updated_at: timestamp(&self.updated_at, "updated_at", &self.id),
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            bank_name: self.bank_name,
            account_number: self.account_number,
            account_name: self.account_name,
            state: self.state,
            city: self.city,
            address: self.address,
            message: self.message,
            payment_reference: self.payment_reference,
            provider_customer_id: self.provider_customer_id,
            amount_paid: self.amount_paid,
            admin_notes: self.admin_notes,
        }
    }
}

impl ContactRow {
    pub fn into_model(self) -> ContactSubmission {
        ContactSubmission {
            id: uuid(&self.id, "id", &self.id),
            user_id: opt_uuid(self.user_id.as_deref(), "user_id", &self.id),
            status: status(&self.status, &self.id),
            created_at: timestamp(&self.created_at, "created_at", &self.id),
            updated_at: timestamp(&self.updated_at, "updated_at", &self.id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            subject: self.subject,
            message: self.message,
            admin_notes: self.admin_notes,
        }
    }
}

impl ContentRow {
    pub fn data_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.data).unwrap_or_else(|e| {
            warn!("Corrupt content in section '{}': {}", self.section, e);
            serde_json::Value::Null
        })
    }
}

impl BlogRow {
    pub fn into_model(self) -> BlogPost {
        BlogPost {
            id: uuid(&self.id, "id", &self.id),
            created_at: timestamp(&self.created_at, "created_at", &self.id),
            updated_at: timestamp(&self.updated_at, "updated_at", &self.id),
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            body: self.body,
            image_url: self.image_url,
            author: self.author,
            published: self.published,
        }
    }
}

impl SocialRow {
    pub fn into_model(self) -> SocialMediaLink {
        SocialMediaLink {
            id: uuid(&self.id, "id", &self.id),
            platform: self.platform,
            url: self.url,
            icon: self.icon,
            sort_order: self.sort_order,
        }
    }
}

impl PaymentSettingsRow {
    pub fn into_model(self) -> PaymentSettings {
        PaymentSettings {
            updated_at: timestamp(&self.updated_at, "updated_at", "payment_settings"),
            amount: self.amount,
            currency: self.currency,
            enabled: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let sqlite = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(sqlite.to_rfc3339(), "2024-03-01T12:30:00+00:00");

        let rfc = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(rfc, sqlite);

        assert!(parse_timestamp("yesterday").is_none());
    }
}
