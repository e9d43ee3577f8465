//! The binary entry point for the application.

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Config;
use app_core::crypto::{AesSecretCrypto, Crypto};
use app_core::middleware::request_response_logger;
use app_core::oauth::{GitHubOAuthProvider, GoogleOAuthProvider, OAuthManager};
use app_core::password::PasswordScheme;
use app_core::view::render_error;
use auth::AuthMode;
use axum::http::StatusCode;
use axum::{Router, middleware};
use base64::Engine as _;
use base64::engine::general_purpose;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use tokio::signal;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Key};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(fmt::format::FmtSpan::CLOSE),
        )
        .init();

    if let Err(err) = run().await {
        panic!("❌ Application failed to start: {err}");
    }
}

/// Initializes all dependencies and starts the web server.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration is reloaded automatically when the file changes. Only
    // `session.max_age_secs` and `session.secure` are read per request; the
    // rest is read once here.
    let config = Arc::new(
        Config::builder("config/config.yaml")
            .watch_interval(Duration::from_secs(5))
            .watch()
            .build()?,
    );

    // Initialize the SeaORM database connection pool.
    let mut db_opt = ConnectOptions::new(config.get::<String>("database.url")?);
    db_opt
        .min_connections(config.get_or("database.min_connections", 1)?)
        .max_connections(config.get_or("database.max_connections", 10)?)
        .connect_timeout(Duration::from_secs(config.get_or("database.connect_timeout_secs", 8)?))
        .acquire_timeout(Duration::from_secs(config.get_or("database.acquire_timeout_secs", 8)?))
        .idle_timeout(Duration::from_secs(config.get_or("database.idle_timeout_secs", 300)?))
        .max_lifetime(Duration::from_secs(config.get_or("database.max_lifetime_secs", 1800)?))
        .sqlx_logging(config.get_or("database.sqlx_logging", false)?)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db_pool = Arc::new(Database::connect(db_opt).await?);

    if config.get_or("database.auto_migrate", true)? {
        Migrator::up(db_pool.as_ref(), None).await?;
        tracing::info!("database migrations applied");
    }

    // Select how passwords are stored.
    let scheme = config.get_or("auth.password_scheme", PasswordScheme::Argon2)?;
    let crypto: Option<Arc<dyn Crypto>> = match scheme {
        PasswordScheme::Encrypted => {
            let secret = config.get::<String>("crypto.secret")?;
            let salt = config.get::<String>("crypto.salt")?;
            Some(Arc::new(AesSecretCrypto::new(&secret, &salt)))
        },
        _ => None,
    };
    let hasher = scheme.hasher(crypto)?;

    let mode = config.get_or("auth.mode", AuthMode::default())?;
    tracing::info!(password_scheme = ?scheme, auth_mode = ?mode, "authentication configured");

    // Initialize the cookie encryption key. Needs at least 64 bytes.
    let key_bytes = general_purpose::STANDARD.decode(config.get::<String>("session.secret")?)?;
    let cookie_key = Key::try_from(key_bytes.as_slice())?;

    // Initialize OAuth Manager and the providers that are configured.
    let mut oauth_manager = OAuthManager::new();
    if let Some(client_id) = optional_setting(&config, "oauth.google.client_id") {
        let client_secret = config.get("oauth.google.client_secret")?;
        let redirect_uri = config.get("oauth.google.redirect_uri")?;
        let google_provider = GoogleOAuthProvider::new(client_id, client_secret, redirect_uri)?;
        oauth_manager.add_provider("google", Arc::new(google_provider));
    }
    if let Some(client_id) = optional_setting(&config, "oauth.github.client_id") {
        let client_secret = config.get("oauth.github.client_secret")?;
        let redirect_uri = config.get("oauth.github.redirect_uri")?;
        let github_provider = GitHubOAuthProvider::new(client_id, client_secret, redirect_uri)?;
        oauth_manager.add_provider("github", Arc::new(github_provider));
    }
    tracing::info!(providers = ?oauth_manager.provider_names(), "oauth providers registered");

    // Initialize auth module
    let auth_state = auth::new(auth::Dependency {
        config: config.clone(),
        db: db_pool.clone(),
        hasher,
        oauth: oauth_manager,
        cookie_key,
        mode,
    })?;

    // Create the Router and Middlewares
    let timeout_secs = Duration::from_secs(config.get_or("server.timeout_secs", 30)?);
    let static_dir = config.get_or("static.dir", "public".to_string())?;

    let app = Router::new()
        .merge(auth::create_router(auth_state))
        .nest_service("/public", ServeDir::new(static_dir))
        .fallback(|| async { (StatusCode::NOT_FOUND, render_error(404, "Page not found")) })
        .method_not_allowed_fallback(|| async {
            (StatusCode::METHOD_NOT_ALLOWED, render_error(405, "Method not allowed"))
        })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_response_logger))
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout_secs)),
        );

    let server_address = config.get_or("server.address", "0.0.0.0:3000".to_string())?;
    let listener = tokio::net::TcpListener::bind(&server_address).await?;

    tracing::info!("🚀 listening on {}", listener.local_addr()?);

    // Shutdown is broadcast so every component can observe it.
    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_shutdown_listener(shutdown_tx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_tx.subscribe().recv().await.ok();
            tracing::info!("🛑 Server is shutting down gracefully...");
        })
        .await?;

    match Arc::try_unwrap(db_pool) {
        Ok(db) => db.close().await?,
        Err(_) => tracing::warn!("database pool still referenced at shutdown"),
    }

    Ok(())
}

/// Reads a string setting that may be absent or left empty.
fn optional_setting(config: &Config, key: &str) -> Option<String> {
    config.get::<String>(key).ok().filter(|value| !value.trim().is_empty())
}

/// Spawns a background task to listen for system shutdown signals.
fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                },
                Err(err) => {
                    tracing::error!("Failed to install SIGTERM handler: {err}");
                    std::future::pending::<()>().await;
                },
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("🔻 Received SIGINT (Ctrl+C)")},
            _ = terminate => { tracing::info!("🔻 Received SIGTERM")},
        }

        if shutdown_tx.send(()).is_err() {
            tracing::error!("Failed to send shutdown signal");
        }
    });
}
