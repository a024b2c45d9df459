use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use rally_types::api::UpdatePaymentSettingsRequest;

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, db_task};

pub async fn get_payment_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = db_task(&state, |db| Ok(db.get_payment_settings()?)).await?;
    Ok(Json(settings.into_model()))
}

pub async fn update_payment_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<UpdatePaymentSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.amount <= 0 {
        return Err(ApiError::invalid("Amount must be positive"));
    }
    let currency = req.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::invalid("Currency must be a three-letter ISO code"));
    }

    let settings = db_task(&state, move |db| {
        db.update_payment_settings(req.amount, &currency, req.enabled)?;
        Ok(db.get_payment_settings()?)
    })
    .await?
    .into_model();

    info!(
        "{} set payment settings: {} {} (enabled={})",
        claims.email, settings.amount, settings.currency, settings.enabled
    );
    Ok(Json(settings))
}
