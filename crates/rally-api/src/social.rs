use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use rally_db::is_unique_violation;
use rally_db::models::NewSocial;
use rally_types::api::SocialMediaRequest;

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, db_task};

/// GET /social-media and GET /admin/social-media
pub async fn list_links(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_social_media()?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

/// PUT /admin/social-media: replace the whole list atomically.
pub async fn replace_links(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<Vec<SocialMediaRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let links = req.into_iter().map(validate).collect::<Result<Vec<_>, _>>()?;
    let count = links.len();

    let rows = db_task(&state, move |db| {
        db.replace_social_media(&links).map_err(platform_conflict)?;
        Ok(db.list_social_media()?)
    })
    .await?;

    info!("{} replaced social media links ({} entries)", claims.email, count);
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

/// POST /admin/social-media
pub async fn create_link(
    State(state): State<AppState>,
    Payload(req): Payload<SocialMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let link = validate(req)?;
    let id = link.id.clone();

    let created = db_task(&state, move |db| {
        db.insert_social_media(&link).map_err(platform_conflict)?;
        db.list_social_media()?
            .into_iter()
            .find(|row| row.id == id)
            .ok_or_else(|| ApiError::not_found("Link"))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created.into_model())))
}

/// DELETE /admin/social-media/{id}
pub async fn delete_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !db_task(&state, move |db| Ok(db.delete_social_media(&id.to_string())?)).await? {
        return Err(ApiError::not_found("Link"));
    }
    Ok(Json(json!({ "deleted": id })))
}

fn validate(req: SocialMediaRequest) -> Result<NewSocial, ApiError> {
    let platform = req.platform.trim().to_lowercase();
    let url = req.url.trim().to_string();

    if platform.is_empty() {
        return Err(ApiError::missing_fields(&["platform"]));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ApiError::invalid(format!("Invalid URL for {platform}")));
    }

    Ok(NewSocial {
        id: Uuid::new_v4().to_string(),
        platform,
        url,
        icon: req.icon.filter(|v| !v.trim().is_empty()),
        sort_order: req.sort_order,
    })
}

fn platform_conflict(err: anyhow::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict("Each platform may only appear once".into())
    } else {
        err.into()
    }
}
