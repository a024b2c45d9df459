use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use rally_db::is_unique_violation;
use rally_types::api::{AuthResponse, LoginRequest, PromoteRequest, RegisterRequest, UserResponse};
use rally_types::models::User;

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, blocking, db_task};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    Payload(req): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let full_name = req.full_name.trim().to_string();

    // Validate input
    if !looks_like_email(&email) {
        return Err(ApiError::invalid("A valid email address is required"));
    }
    if full_name.is_empty() {
        return Err(ApiError::missing_fields(&["fullName"]));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password = req.password;
    let password_hash = blocking(move || hash_password(&password)).await?;
    let user_id = Uuid::new_v4();

    let user = db_task(&state, move |db| {
        // Check if email is taken
        if db.get_user_by_email(&email)?.is_some() {
            return Err(email_taken());
        }

        db.create_user(&user_id.to_string(), &email, &full_name, &password_hash)
            .map_err(|e| if is_unique_violation(&e) { email_taken() } else { e.into() })?;

        db.get_user_by_id(&user_id.to_string())?
            .map(|row| row.into_model())
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user {user_id} vanished after insert")))
    })
    .await?;

    info!("Registered user {}", user.email);
    let token = create_token(&state, &user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let row = db_task(&state, move |db| Ok(db.get_user_by_email(&email)?))
        .await?
        .ok_or_else(bad_credentials)?;

    // Verify password
    let stored = row.password.clone();
    let user_id = row.id.clone();
    let password = req.password;
    let valid = blocking(move || verify_password(&password, &stored, &user_id)).await?;
    if !valid {
        warn!("Failed login for {}", row.email);
        return Err(bad_credentials());
    }

    let user = row.into_model();
    let token = create_token(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let user = db_task(&state, move |db| Ok(db.get_user_by_id(&user_id)?))
        .await?
        .ok_or_else(ApiError::unauthorized)?
        .into_model();

    Ok(Json(UserResponse { user }))
}

/// Grant the admin flag by email. Already-admin users are returned unchanged.
pub async fn promote_to_admin(
    State(state): State<AppState>,
    Payload(req): Payload<PromoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let user = db_task(&state, move |db| Ok(db.set_admin_by_email(&email, true)?))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?
        .into_model();

    info!("Admin rights granted to {}", user.email);
    Ok(Json(UserResponse { user }))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored: &str, user_id: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored).map_err(|e| {
        ApiError::Internal(anyhow::anyhow!("stored hash for {user_id} unreadable: {e}"))
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        is_admin: user.is_admin,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(token)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

fn email_taken() -> ApiError {
    ApiError::Conflict("An account with this email already exists".into())
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".into())
}
