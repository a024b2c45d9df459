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
use rally_db::models::BlogFields;
use rally_types::api::BlogPostRequest;

use crate::error::{ApiError, Payload};
use crate::middleware::Claims;
use crate::state::{AppState, db_task};

/// GET /blog: published posts, newest first.
pub async fn list_published(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_blog_posts(true)?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

/// GET /admin/blog: drafts included.
pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = db_task(&state, |db| Ok(db.list_blog_posts(false)?)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect::<Vec<_>>()))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = db_task(&state, move |db| {
        db.get_blog_post(&id.to_string())?
            .filter(|row| row.published)
            .ok_or_else(|| ApiError::not_found("Post"))
    })
    .await?;
    Ok(Json(post.into_model()))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<BlogPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = validate(req)?;
    let id = Uuid::new_v4();

    let post = db_task(&state, move |db| {
        db.insert_blog_post(&id.to_string(), &fields).map_err(slug_conflict)?;
        db.get_blog_post(&id.to_string())?
            .ok_or_else(|| ApiError::not_found("Post"))
    })
    .await?
    .into_model();

    info!("{} created post '{}'", claims.email, post.slug);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Payload(req): Payload<BlogPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = validate(req)?;

    let post = db_task(&state, move |db| {
        let pid = id.to_string();
        if !db.update_blog_post(&pid, &fields).map_err(slug_conflict)? {
            return Err(ApiError::not_found("Post"));
        }
        db.get_blog_post(&pid)?.ok_or_else(|| ApiError::not_found("Post"))
    })
    .await?
    .into_model();

    info!("{} updated post '{}'", claims.email, post.slug);
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !db_task(&state, move |db| Ok(db.delete_blog_post(&id.to_string())?)).await? {
        return Err(ApiError::not_found("Post"));
    }

    info!("{} deleted post {}", claims.email, id);
    Ok(Json(json!({ "deleted": id })))
}

fn validate(req: BlogPostRequest) -> Result<BlogFields, ApiError> {
    let title = req.title.trim().to_string();
    let body = req.body.trim().to_string();

    let mut missing = Vec::new();
    if title.is_empty() {
        missing.push("title");
    }
    if body.is_empty() {
        missing.push("body");
    }
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(&missing));
    }

    let slug = slugify(req.slug.as_deref().unwrap_or(title.as_str()));
    if slug.is_empty() {
        return Err(ApiError::invalid("Slug must contain at least one letter or digit"));
    }

    Ok(BlogFields {
        title,
        slug,
        excerpt: req.excerpt.filter(|v| !v.trim().is_empty()),
        body,
        image_url: req.image_url.filter(|v| !v.trim().is_empty()),
        author: req.author.filter(|v| !v.trim().is_empty()),
        published: req.published,
    })
}

fn slug_conflict(err: anyhow::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict("A post with this slug already exists".into())
    } else {
        err.into()
    }
}

/// Lowercase ASCII letters and digits, runs of anything else collapsed to one `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Rally 2025: Day #1-- "), "rally-2025-day-1");
        assert_eq!(slugify("¡¿!?"), "");
    }

    #[test]
    fn slug_defaults_to_title() {
        let fields = validate(BlogPostRequest {
            title: "Town Hall Recap".into(),
            slug: None,
            excerpt: Some("  ".into()),
            body: "We met.".into(),
            image_url: None,
            author: None,
            published: true,
        })
        .unwrap();
        assert_eq!(fields.slug, "town-hall-recap");
        assert!(fields.excerpt.is_none());
    }

    #[test]
    fn empty_title_and_body_are_both_reported() {
        let err = validate(BlogPostRequest {
            title: " ".into(),
            slug: None,
            excerpt: None,
            body: "".into(),
            image_url: None,
            author: None,
            published: false,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: title, body");
    }
}
