use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::{Map, Value, json};
use tracing::info;

use rally_types::api::UpsertContentRequest;

use crate::error::{ApiError, Payload};
use crate::state::{AppState, db_task};

const MAX_SECTION_LEN: usize = 64;

/// GET /content: every section, keyed by name.
pub async fn list_content(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_content()?)).await?;
    let sections: Map<String, Value> = rows
        .into_iter()
        .map(|row| {
            let data = row.data_json();
            (row.section, data)
        })
        .collect();
    Ok(Json(Value::Object(sections)))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = db_task(&state, move |db| {
        db.get_content(&section)?
            .ok_or_else(|| ApiError::not_found("Content section"))
    })
    .await?;
    Ok(Json(row.data_json()))
}

/// POST /content `{section, data}`
pub async fn create_content(
    State(state): State<AppState>,
    Payload(req): Payload<UpsertContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    save(&state, req.section, req.data).await
}

/// PUT /content/{section}: the body replaces the section wholesale.
pub async fn put_content(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Payload(data): Payload<Value>,
) -> Result<impl IntoResponse, ApiError> {
    save(&state, section, data).await
}

async fn save(state: &AppState, section: String, data: Value) -> Result<Json<Value>, ApiError> {
    let section = section.trim().to_string();
    if section.is_empty() {
        return Err(ApiError::missing_fields(&["section"]));
    }
    if section.len() > MAX_SECTION_LEN || !section.chars().all(is_section_char) {
        return Err(ApiError::invalid(
            "Section names may only contain letters, digits, '-' and '_'",
        ));
    }

    let raw = data.to_string();
    let name = section.clone();
    db_task(state, move |db| Ok(db.upsert_content(&name, &raw)?)).await?;

    info!("Content section '{}' updated", section);
    Ok(Json(json!({ "section": section, "data": data })))
}

fn is_section_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
