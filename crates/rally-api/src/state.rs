use std::sync::Arc;

use tracing::error;

use rally_db::Database;

use crate::error::ApiError;
use crate::payments::provider::PaymentProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub payments: Box<dyn PaymentProvider>,
    /// Handed to browsers by `/payments/config`; never the secret key.
    pub payment_public_key: String,
    pub payment_callback_url: Option<String>,
    /// When set, `/auth/promote-to-admin` is reachable without an admin token.
    pub open_admin_promotion: bool,
}

/// Run blocking database work off the async runtime.
pub async fn db_task<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    blocking(move || f(&state.db)).await
}

/// Run CPU-heavy or blocking work (password hashing, SQLite) on the blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed"))
    })?
}
