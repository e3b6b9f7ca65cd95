mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use dealroom_api::auth::{self, AppState, AppStateInner};
use dealroom_api::intermediary::IntermediaryDirectory;
use dealroom_api::notify::{self, Notifier};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealroom=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = dealroom_db::Database::open(&config.db_path)?;

    match &config.admin_password {
        Some(password) => {
            auth::seed_admin(&db, &config.admin_email, password)?;
        }
        None => warn!(
            "DEALROOM_ADMIN_PASSWORD not set; {} must already exist or messages cannot be sent",
            config.admin_email
        ),
    }

    // Shared state
    let notifier = Notifier::default();
    tokio::spawn(notify::run_delivery_loop(notifier.subscribe()));

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        token_ttl: config.token_ttl,
        intermediary: IntermediaryDirectory::new(&config.admin_email, config.admin_cache_ttl),
        notifier,
    });

    let app = dealroom_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Dealroom server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
