//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Every route is registered
//! through [`guarded`] with its access policy.

mod auth;
mod protected;

use crate::auth::{require_policy, PolicyState, Requirement, Role, RoutePolicy};
use crate::config::Settings;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    api_routes(state).layer(middleware)
}

/// Routes and their policies, without the outer middleware stack
pub fn api_routes(state: SharedState) -> Router {
    let public = RoutePolicy::public();
    let basic_any = RoutePolicy::basic(Requirement::AuthenticatedAny);
    let bearer_any = RoutePolicy::bearer(Requirement::AuthenticatedAny);
    let bearer_admin = RoutePolicy::bearer(Requirement::AuthenticatedRole(Role::Admin));

    Router::new()
        // Public
        .route("/", guarded(&state, public, get(protected::home)))
        .route("/status", guarded(&state, public, get(protected::status)))
        .route("/health", guarded(&state, public, get(health_check)))
        .route("/login", guarded(&state, public, post(auth::login)))
        // Basic auth
        .route(
            "/basic-protected",
            guarded(&state, basic_any, get(protected::basic_protected)),
        )
        // JWT
        .route(
            "/jwt-protected",
            guarded(&state, bearer_any, get(protected::jwt_protected)),
        )
        .route(
            "/admin-only",
            guarded(&state, bearer_admin, get(protected::admin_only)),
        )
        .fallback(not_found)
        .with_state(state)
}

/// Bind a handler to its policy.
fn guarded(
    state: &SharedState,
    policy: RoutePolicy,
    handler: MethodRouter<SharedState>,
) -> MethodRouter<SharedState> {
    handler.route_layer(from_fn_with_state(
        PolicyState::new(state.clone(), policy),
        require_policy,
    ))
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::WWW_AUTHENTICATE])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
