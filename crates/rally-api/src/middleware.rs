use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

pub use rally_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, db_task};

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = match bearer_token(req.headers())? {
        Some(token) => decode_token(&state.jwt_secret, token)?,
        None => return Err(ApiError::unauthorized()),
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Like [`require_auth`], but a request without an Authorization header passes
/// through anonymously. A header that is present must still be valid and name
/// an existing user, since handlers behind this layer link rows to `sub`.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = match bearer_token(req.headers())? {
        Some(token) => Some(decode_token(&state.jwt_secret, token)?),
        None => None,
    };

    if let Some(claims) = claims {
        let user_id = claims.sub.to_string();
        let exists = db_task(&state, move |db| Ok(db.get_user_by_id(&user_id)?.is_some())).await?;
        if !exists {
            warn!("Token for deleted user {} rejected", claims.email);
            return Err(ApiError::Unauthorized("Account no longer exists".into()));
        }
        req.extensions_mut().insert(claims);
    }
    Ok(next.run(req).await)
}

/// Role gate. Must be layered inside [`require_auth`]. The admin flag is
/// re-read from the database, so revoking or deleting an admin takes effect
/// before their token expires.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(ApiError::unauthorized)?;

    if !is_admin(&state, &claims).await? {
        warn!("Non-admin {} denied {} {}", claims.email, req.method(), req.uri().path());
        return Err(ApiError::forbidden());
    }

    Ok(next.run(req).await)
}

pub async fn is_admin(state: &AppState, claims: &Claims) -> Result<bool, ApiError> {
    let user_id = claims.sub.to_string();
    let user = db_task(state, move |db| Ok(db.get_user_by_id(&user_id)?)).await?;
    Ok(user.is_some_and(|u| u.is_admin))
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".into()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!("Rejected token: {}", e);
        ApiError::Unauthorized("Invalid or expired token".into())
    })
}
