use axum::{
    Json, Router, middleware,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::middleware::{optional_auth, require_admin, require_auth};
use crate::state::AppState;
use crate::{auth, blog, content, payments, settings, social, submissions, users};

/// The full HTTP surface. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let mut public_routes = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/content", get(content::list_content))
        .route("/content/{section}", get(content::get_content))
        .route("/blog", get(blog::list_published))
        .route("/blog/{id}", get(blog::get_post))
        .route("/social-media", get(social::list_links))
        .route("/payments/initialize", post(payments::initialize_payment))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/payments/config", get(payments::payment_config));

    // Visitors may submit anonymously; a token, if sent, must be valid.
    let submission_routes = Router::new()
        .route("/submissions/participate", post(submissions::submit_participation))
        .route("/submissions/contact", post(submissions::submit_contact))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/submissions/my", get(submissions::my_submissions))
        .route("/payments/my", get(payments::my_payments))
        .route("/payments/{reference}", get(payments::get_payment))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let mut admin_routes = Router::new()
        .route("/content", post(content::create_content))
        .route("/content/{section}", put(content::put_content))
        .route("/submissions/participate", get(submissions::list_participate))
        .route(
            "/submissions/participate/{id}",
            get(submissions::get_participate)
                .put(submissions::update_participate)
                .delete(submissions::delete_participate),
        )
        .route("/submissions/contact", get(submissions::list_contact))
        .route(
            "/submissions/contact/{id}",
            get(submissions::get_contact)
                .put(submissions::update_contact)
                .delete(submissions::delete_contact),
        )
        .route("/blog", post(blog::create_post))
        .route("/blog/{id}", put(blog::update_post).delete(blog::delete_post))
        .route("/admin/blog", get(blog::list_all))
        .route(
            "/admin/social-media",
            get(social::list_links)
                .put(social::replace_links)
                .post(social::create_link),
        )
        .route("/admin/social-media/{id}", delete(social::delete_link))
        .route("/admin/users", get(users::list_users))
        .route(
            "/admin/users/{id}",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/admin/users/{id}/admin", put(users::set_admin))
        .route(
            "/admin/payment-settings",
            get(settings::get_payment_settings).put(settings::update_payment_settings),
        )
        .route("/payments", get(payments::list_payments));

    // Bootstrap mode: anyone may promote an account until an operator turns it off.
    if state.open_admin_promotion {
        public_routes = public_routes.route("/auth/promote-to-admin", post(auth::promote_to_admin));
    } else {
        admin_routes = admin_routes.route("/auth/promote-to-admin", post(auth::promote_to_admin));
    }

    // The last layer added runs first: authenticate, then check the role.
    let admin_routes = admin_routes
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(submission_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}
