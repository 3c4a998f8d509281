//! HTTP routes of the session service

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::{
    error::{AuthError, AuthResult},
    fallback::{RouteTable, SpaShell},
    guard::RouteClass,
    middleware::session_middleware,
    models::{LoginRequest, LoginResponse},
    session::{RequestContext, SessionUpdate},
    state::AppState,
};

/// API prefixes that belong to collaborators outside this service
pub const RESERVED_PREFIXES: [&str; 2] = ["/projects", "/searchProjects"];

/// Create the router for the service
///
/// `/health` and files present in the SPA build directory are answered
/// without a session; everything else passes through the session middleware.
pub fn create_router(state: AppState, shell: SpaShell) -> Router {
    let mut table = RouteTable::new()
        .reserve("/health", RouteClass::Public)
        .mount("/auth", RouteClass::Public, auth_router())
        .mount(
            "/userData",
            RouteClass::Protected,
            Router::new().route("/", get(user_data)),
        );

    for prefix in RESERVED_PREFIXES {
        table = table.reserve(prefix, RouteClass::Protected);
    }
    let prefixes = table.prefixes();

    let app = table
        .build(&shell)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .with_state(state.clone());

    let health: Router = Router::new()
        .route("/health", get(health_check))
        .with_state(state);

    health
        .merge(shell.serve(prefixes, app))
        .layer(TraceLayer::new_for_http())
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/status", get(status))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.store().health_check().await.unwrap_or_else(|e| {
        error!("Session store health check failed: {}", e);
        false
    });
    let users = state.users.health_check().await.unwrap_or_else(|e| {
        error!("User directory health check failed: {}", e);
        false
    });

    Json(json!({
        "status": if sessions && users { "ok" } else { "degraded" },
        "service": "optask",
        "sessionStore": sessions,
        "userDirectory": users,
    }))
}

/// User login endpoint
///
/// Answers `{ "loginState": false }` for any credential mismatch without
/// saying which part was wrong.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<Response> {
    match state
        .verifier
        .verify(&payload.user_email, &payload.user_password)
        .await
    {
        Ok(user) => Ok((
            SessionUpdate::Login(user),
            Json(LoginResponse { login_state: true }),
        )
            .into_response()),
        Err(AuthError::InvalidCredentials) => {
            Ok(Json(LoginResponse { login_state: false }).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Logout endpoint; harmless on an anonymous session
pub async fn logout() -> impl IntoResponse {
    (
        SessionUpdate::Logout,
        Json(LoginResponse { login_state: false }),
    )
}

/// Whether the current session is logged in
pub async fn status(ctx: RequestContext) -> Json<LoginResponse> {
    Json(LoginResponse {
        login_state: ctx.is_authenticated(),
    })
}

/// Profile of the logged-in user
pub async fn user_data(ctx: RequestContext) -> AuthResult<impl IntoResponse> {
    let user = ctx.user.ok_or(AuthError::Unauthenticated)?;

    Ok(Json(json!({
        "id": user.id,
        "email": user.email,
    })))
}
