mod cli;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use clap::Parser;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use rally_api::auth::normalize_email;
use rally_api::payments::provider::PaystackClient;
use rally_api::{AppState, AppStateInner};
use rally_db::Database;

use crate::cli::{Args, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rally=debug,rally_api=debug,rally_db=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    match args.command.unwrap_or_default() {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            Database::open(&config.db_path)?.close();
            Ok(())
        }
        Command::Promote { email } => set_admin(&config, &email, true),
        Command::Demote { email } => set_admin(&config, &email, false),
        Command::ListAdmins => {
            let db = Database::open(&config.db_path)?;
            for admin in db.list_admins()? {
                println!("{}\t{}\t{}", admin.id, admin.email, admin.full_name);
            }
            db.close();
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.check_serving()?;

    if config.paystack_secret_key.is_empty() {
        warn!("PAYSTACK_SECRET_KEY is unset; payment initialization and verification will fail");
    }
    if config.open_admin_promotion {
        warn!("RALLY_OPEN_ADMIN_PROMOTION is on: anyone can call /auth/promote-to-admin");
    }

    // Init database
    let db = Database::open(&config.db_path)?;
    let payments = PaystackClient::new(&config.paystack_base_url, &config.paystack_secret_key)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: chrono::Duration::days(config.token_ttl_days),
        payments: Box::new(payments),
        payment_public_key: config.paystack_public_key.clone(),
        payment_callback_url: config.payment_callback_url.clone(),
        open_admin_promotion: config.open_admin_promotion,
    });

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(
                HeaderValue::from_str(origin).context("RALLY_CORS_ORIGIN is not a valid header value")?,
            ))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        None => CorsLayer::permissive(),
    };

    let app = rally_api::router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Rally server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router and its clones are gone once serve returns.
    match Arc::try_unwrap(state) {
        Ok(inner) => inner.db.close(),
        Err(_) => warn!("State still shared at shutdown; database closed on drop"),
    }

    Ok(())
}

fn set_admin(config: &Config, email: &str, is_admin: bool) -> anyhow::Result<()> {
    let email = normalize_email(email);
    let db = Database::open(&config.db_path)?;
    let result = db.set_admin_by_email(&email, is_admin);
    db.close();

    match result? {
        Some(user) => {
            info!("{} is_admin={}", user.email, user.is_admin);
            println!("{} is {}an admin", user.email, if user.is_admin { "now " } else { "no longer " });
            Ok(())
        }
        None => bail!("no user with email {email}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sig) => sig,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
