use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;
use crate::services;

/// Application-level error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigLoadingFailed(#[from] config::ConfigError),

    #[error("Invalid recovery.link_base_url: {0}")]
    InvalidResetLinkBase(#[from] url::ParseError),

    #[error("Database error: {0}")]
    DatabaseOperationFailed(#[from] db::DbError),

    #[error("Migration error: {0}")]
    MigrationFailed(#[from] app::MigrationError),

    #[error("CLI error: {0}")]
    CliOperationFailed(#[from] app::CliError),

    #[error("JWT secret error: {0}")]
    JwtSecretFailed(#[from] auth::JwtError),

    #[error("Mail notifier error: {0}")]
    NotifierFailed(#[from] services::NotifierError),

    #[error("Network address parsing error: {0}")]
    AddressParsingFailed(#[from] std::net::AddrParseError),

    #[error("Server error: {0}")]
    ServerStartingFailed(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

pub async fn run() {
    if let Err(e) = run_app().await {
        eprintln!("❌ {e}\n");

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("Caused by: {err}");
            source = err.source();
        }

        std::process::exit(1);
    }
}

async fn run_app() -> Result<(), AppError> {
    let settings = cfg::AppSettings::new()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&settings.server.log_directives))
        .with(tracing_subscriber::fmt::layer())
        .init();

    url::Url::parse(&settings.recovery.link_base_url)?;

    let db = Arc::new(db::Database::open(&settings.database).await?);
    let jwt = auth::JwtContext::new(&settings.jwt, &auth::get_jwt_secret()?)?;
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let notifier = services::notifier_from_settings(http_client, &settings.mail)?;

    let server_address = settings.get_server_address();
    let run_migrations_on_startup = settings.database.run_migrations_on_startup;
    let context = core::Context::new(db.clone(), jwt, settings, notifier);

    // CLI commands see the schema as it is, before any automatic migration
    app::run_cli(&context).await?;
    if run_migrations_on_startup {
        app::run_migrations(&db.pool().await).await?;
    }

    let address = server_address.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    let router = app::create_router(context.clone());
    tracing::info!("🚀 starting server");
    tracing::info!("   app_env: {}", cfg::AppSettings::get_app_run_env());
    tracing::info!("   cfg_dir: {}", cfg::AppSettings::get_config_full_path());
    tracing::info!("   logging: {}", context.settings.server.log_directives);
    tracing::info!("   address: http://{server_address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

/// Waits for CTRL+C, used by `with_graceful_shutdown`.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, shutting down gracefully"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
