//! Gatekeeper API - credential verification and token-based authorization
//!
//! Authenticates callers either with HTTP Basic credentials or with a signed
//! JWT obtained from `POST /login`, and enforces a declared access policy on
//! every route:
//! - Public routes are open to anyone
//! - `/basic-protected` accepts verified username/password pairs
//! - `/jwt-protected` accepts any valid access token
//! - `/admin-only` accepts valid access tokens carrying the `admin` role
//!
//! Every credential or token failure is the same `401 {"error": "Unauthorized"}`;
//! only a valid identity with the wrong role gets `403`.

mod auth;
mod config;
mod error;
mod routes;
mod state;
mod users;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use crate::users::{default_seed, load_seed_file, CredentialStore, InMemoryCredentialStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Gatekeeper API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");
    debug!(auth = ?settings.auth, "Authentication settings");

    // Populate the credential store; hashing is slow, keep it off the runtime
    let auth_settings = settings.auth.clone();
    let store = tokio::task::spawn_blocking(move || -> anyhow::Result<InMemoryCredentialStore> {
        let seed = match &auth_settings.users_file {
            Some(path) => {
                info!("👥 Loading accounts from {}", path.display());
                load_seed_file(path)?
            }
            None => {
                warn!("⚠️  USERS_FILE not set, using built-in demo accounts (INSECURE)");
                default_seed()
            }
        };
        Ok(InMemoryCredentialStore::from_seed(seed, auth_settings.bcrypt_cost)?)
    })
    .await??;

    if store.is_empty() {
        warn!("⚠️  Credential store is empty, every authenticated route will refuse access");
    }
    info!("✅ Credential store ready with {} accounts", store.len());
    for user in store.list() {
        debug!(username = %user.username, role = %user.role, "Account loaded");
    }

    let state = Arc::new(AppState::new(Arc::new(store), &settings.auth)?);

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   GET  /                - Welcome message");
    info!("   GET  /status          - Status check");
    info!("   GET  /health          - Health check");
    info!("   POST /login           - Exchange username/password for an access token");
    info!("   GET  /basic-protected - Basic Auth protected");
    info!("   GET  /jwt-protected   - JWT protected");
    info!("   GET  /admin-only      - JWT protected, admin role only");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gatekeeper_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
