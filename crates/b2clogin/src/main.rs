mod app;
mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use b2clogin_auth::{AuthState, B2cConfig};
use b2clogin_core::auth::{IdentityClient, SessionRepository};
use clap::Parser;
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{app::create_app, config::Config, state::AppState};

#[cfg(all(feature = "sessions-sqlite", feature = "sessions-redis"))]
compile_error!("Cannot enable both 'sessions-sqlite' and 'sessions-redis' features");

/// b2clogin - Sign in with Azure AD B2C
#[derive(Parser, Debug)]
#[command(name = "b2clogin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "5000", env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "b2clogin=debug,b2clogin_auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let b2c_config = B2cConfig::from_env().context("invalid B2C configuration")?;
    tracing::debug!(?b2c_config, "Loaded B2C configuration");

    let sessions = init_sessions(&config, &b2c_config).await?;
    let (identity, b2c_config) = init_identity(&config, b2c_config).await?;

    let state = AppState::new(AuthState::new(sessions, identity, b2c_config));

    // Build the application router
    let app = create_app(state);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the session store selected by cargo features.
#[cfg(feature = "sessions-sqlite")]
async fn init_sessions(
    config: &Config,
    _b2c_config: &B2cConfig,
) -> Result<Arc<dyn SessionRepository>> {
    use b2clogin_auth::SqliteSessionStore;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

    let options = SqliteConnectOptions::new()
        .filename(&config.sqlite_path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .with_context(|| format!("failed to open {}", config.sqlite_path))?;

    let store = SqliteSessionStore::new(pool);
    store.migrate().await?;

    let removed = store.delete_expired(chrono::Utc::now()).await?;
    tracing::info!(path = %config.sqlite_path, removed, "Using SQLite session store");

    Ok(Arc::new(store))
}

#[cfg(feature = "sessions-redis")]
async fn init_sessions(
    config: &Config,
    _b2c_config: &B2cConfig,
) -> Result<Arc<dyn SessionRepository>> {
    use b2clogin_auth::RedisSessionStore;
    use fred::prelude::{Builder, ClientLike};

    let redis_config = fred::types::config::Config::from_url(&config.redis_url)
        .context("invalid REDIS_URL")?;
    let pool = Builder::from_config(redis_config)
        .build_pool(4)
        .context("failed to create Redis pool")?;
    pool.init().await.context("failed to connect to Redis")?;

    tracing::info!(url = %config.redis_url, "Using Redis session store");
    Ok(Arc::new(RedisSessionStore::new(pool)))
}

#[cfg(not(any(feature = "sessions-sqlite", feature = "sessions-redis")))]
async fn init_sessions(
    _config: &Config,
    _b2c_config: &B2cConfig,
) -> Result<Arc<dyn SessionRepository>> {
    tracing::info!("Using in-memory session store");
    Ok(Arc::new(b2clogin_auth::InMemorySessionStore::new()))
}

/// Create the B2C client, fetching provider metadata.
#[cfg(not(feature = "auth-mock"))]
async fn init_identity(
    _config: &Config,
    b2c_config: B2cConfig,
) -> Result<(Arc<dyn IdentityClient>, B2cConfig)> {
    let client = b2clogin_auth::B2cClient::new(&b2c_config)
        .await
        .context("failed to initialize the B2C client")?;

    Ok((Arc::new(client), b2c_config))
}

/// Point the authority at the mock IdP and start it.
#[cfg(feature = "auth-mock")]
async fn init_identity(
    config: &Config,
    mut b2c_config: B2cConfig,
) -> Result<(Arc<dyn IdentityClient>, B2cConfig)> {
    use b2clogin_auth::{mock_idp::MockIdpServer, MockIdentityClient};

    b2c_config.authority_host = format!("http://localhost:{}", config.mock_idp_port)
        .parse()
        .context("invalid mock IdP URL")?;

    let server = MockIdpServer::new(config.mock_idp_port);
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Mock IdP server failed");
        }
    });

    tracing::warn!(
        authority = %b2c_config.authority(b2clogin_core::auth::UserFlow::SignUpSignIn),
        "Using mock identity provider"
    );

    let client = MockIdentityClient::new(b2c_config.clone());
    Ok((Arc::new(client), b2c_config))
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
