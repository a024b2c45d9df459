use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use rally_types::api::{SetAdminRequest, UserResponse};

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, db_task};

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_users()?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = db_task(&state, move |db| {
        db.get_user_by_id(&id.to_string())?
            .ok_or_else(|| ApiError::not_found("User"))
    })
    .await?
    .into_model();
    Ok(Json(UserResponse { user }))
}

/// PUT /admin/users/{id}/admin: toggle the admin flag.
pub async fn set_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<SetAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if id == claims.sub && !req.is_admin {
        return Err(ApiError::invalid("You cannot revoke your own admin rights"));
    }

    let user = db_task(&state, move |db| {
        db.set_admin(&id.to_string(), req.is_admin)?
            .ok_or_else(|| ApiError::not_found("User"))
    })
    .await?
    .into_model();

    info!("{} set admin={} on {}", claims.email, user.is_admin, user.email);
    Ok(Json(UserResponse { user }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if id == claims.sub {
        return Err(ApiError::invalid("You cannot delete your own account"));
    }

    if !db_task(&state, move |db| Ok(db.delete_user(&id.to_string())?)).await? {
        return Err(ApiError::not_found("User"));
    }

    info!("{} deleted user {}", claims.email, id);
    Ok(Json(json!({ "deleted": id })))
}
