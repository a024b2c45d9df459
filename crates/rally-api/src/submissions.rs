use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use rally_db::models::{NewContact, NewParticipate};
use rally_types::api::{ContactRequest, CreatedResponse, ParticipateRequest, UpdateStatusRequest};

use crate::auth::{looks_like_email, normalize_email};
use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, db_task};

// -- Public submission --

/// POST /submissions/participate: open to visitors; a bearer token, if sent,
/// links the submission to that user.
pub async fn submit_participation(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Payload(req): Payload<ParticipateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = req.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    if !looks_like_email(&email) {
        return Err(ApiError::invalid("A valid email address is required"));
    }

    let interests: Vec<String> = req
        .interests
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();

    let id = Uuid::new_v4();
    let new = NewParticipate {
        id: id.to_string(),
        user_id: claims.map(|Extension(c)| c.sub.to_string()),
        full_name: required(req.full_name),
        email,
        phone: required(req.phone),
        bank_name: required(req.bank_name),
        account_number: required(req.account_number),
        account_name: required(req.account_name),
        state: optional(req.state),
        city: optional(req.city),
        address: optional(req.address),
        interests: serde_json::to_string(&interests).map_err(anyhow::Error::from)?,
        message: optional(req.message),
    };

    db_task(&state, move |db| Ok(db.insert_participate(&new)?)).await?;

    info!("New participation submission {}", id);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// POST /submissions/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Payload(req): Payload<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = req.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    if !looks_like_email(&email) {
        return Err(ApiError::invalid("A valid email address is required"));
    }

    let id = Uuid::new_v4();
    let new = NewContact {
        id: id.to_string(),
        user_id: claims.map(|Extension(c)| c.sub.to_string()),
        name: required(req.name),
        email,
        phone: optional(req.phone),
        subject: optional(req.subject),
        message: required(req.message),
    };

    db_task(&state, move |db| Ok(db.insert_contact(&new)?)).await?;

    info!("New contact submission {}", id);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /submissions/my: the caller's own participation submissions.
pub async fn my_submissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = db_task(&state, move |db| Ok(db.list_participate_by_user(&uid)?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

// -- Admin: participate --

pub async fn list_participate(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_participate()?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

pub async fn get_participate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = db_task(&state, move |db| {
        db.get_participate(&id.to_string())?
            .ok_or_else(|| ApiError::not_found("Submission"))
    })
    .await?;
    Ok(Json(row.into_model()))
}

/// PUT /submissions/participate/{id}: any status may be assigned from any other.
pub async fn update_participate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = db_task(&state, move |db| {
        let sid = id.to_string();
        if !db.update_participate_status(&sid, req.status, req.admin_notes.as_deref())? {
            return Err(ApiError::not_found("Submission"));
        }
        db.get_participate(&sid)?
            .ok_or_else(|| ApiError::not_found("Submission"))
    })
    .await?;

    info!("{} set participation {} to {}", claims.email, id, row.status);
    Ok(Json(row.into_model()))
}

pub async fn delete_participate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = db_task(&state, move |db| Ok(db.delete_participate(&id.to_string())?)).await?;
    if !deleted {
        return Err(ApiError::not_found("Submission"));
    }

    info!("{} deleted participation {}", claims.email, id);
    Ok(Json(json!({ "deleted": id })))
}

// -- Admin: contact --

pub async fn list_contact(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_contact()?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = db_task(&state, move |db| {
        db.get_contact(&id.to_string())?
            .ok_or_else(|| ApiError::not_found("Submission"))
    })
    .await?;
    Ok(Json(row.into_model()))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = db_task(&state, move |db| {
        let sid = id.to_string();
        if !db.update_contact_status(&sid, req.status, req.admin_notes.as_deref())? {
            return Err(ApiError::not_found("Submission"));
        }
        db.get_contact(&sid)?
            .ok_or_else(|| ApiError::not_found("Submission"))
    })
    .await?;

    info!("{} set contact {} to {}", claims.email, id, row.status);
    Ok(Json(row.into_model()))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = db_task(&state, move |db| Ok(db.delete_contact(&id.to_string())?)).await?;
    if !deleted {
        return Err(ApiError::not_found("Submission"));
    }

    info!("{} deleted contact {}", claims.email, id);
    Ok(Json(json!({ "deleted": id })))
}

/// Present and non-blank; guaranteed by `missing_fields` before this is called.
fn required(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
