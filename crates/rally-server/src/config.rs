use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use rally_api::payments::provider::DEFAULT_PAYSTACK_URL;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub open_admin_promotion: bool,
    pub paystack_secret_key: String,
    pub paystack_public_key: String,
    pub paystack_base_url: String,
    pub payment_callback_url: Option<String>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("RALLY_PORT") {
            Some(v) => v.parse().with_context(|| format!("RALLY_PORT '{v}' is not a port"))?,
            None => 3000,
        };
        let token_ttl_days = match var("RALLY_TOKEN_TTL_DAYS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("RALLY_TOKEN_TTL_DAYS '{v}' is not a number"))?,
            None => 7,
        };
        if token_ttl_days <= 0 {
            bail!("RALLY_TOKEN_TTL_DAYS must be positive");
        }
        let open_admin_promotion = match var("RALLY_OPEN_ADMIN_PROMOTION") {
            Some(v) => parse_bool(&v)
                .with_context(|| format!("RALLY_OPEN_ADMIN_PROMOTION '{v}' is not a boolean"))?,
            None => false,
        };

        Ok(Self {
            db_path: var("RALLY_DB_PATH").unwrap_or_else(|| "rally.db".into()).into(),
            host: var("RALLY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt_secret: var("RALLY_JWT_SECRET").unwrap_or_default(),
            token_ttl_days,
            open_admin_promotion,
            paystack_secret_key: var("PAYSTACK_SECRET_KEY").unwrap_or_default(),
            paystack_public_key: var("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            paystack_base_url: var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PAYSTACK_URL.into()),
            payment_callback_url: var("RALLY_PAYMENT_CALLBACK_URL"),
            cors_origin: var("RALLY_CORS_ORIGIN"),
        })
    }

    /// Serving needs a real signing secret; the admin CLI does not.
    pub fn check_serving(&self) -> Result<()> {
        if self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str()) {
            bail!("RALLY_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
