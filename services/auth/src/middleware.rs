//! Session middleware: attaches session state to each request and writes
//! back whatever the handler changed

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;

use crate::{
    error::AuthError,
    session::SessionUpdate,
    state::AppState,
};

/// Resolve the signed session cookie, run the handler, then persist
///
/// The handler sees an immutable [`RequestContext`](crate::session::RequestContext) in the request extensions
/// and may hand back a [`SessionUpdate`] in its response. A cookie is sent only
/// when the session was saved. Store failures fail the request.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let sessions = &state.sessions;

    // Unsigned or tampered cookies are dropped by the jar
    let jar = SignedCookieJar::from_headers(req.headers(), sessions.key().clone());
    let presented = jar
        .get(&sessions.config().cookie_name)
        .map(|cookie| cookie.value().to_string());

    let ctx = sessions.load(presented.as_deref()).await?;
    req.extensions_mut().insert(ctx.clone());

    let mut response = next.run(req).await;
    let update = response.extensions_mut().remove::<SessionUpdate>();

    match sessions.commit(ctx, update).await? {
        Some(record) => {
            let jar = jar.add(sessions.cookie_for(&record));
            Ok((jar, response).into_response())
        }
        None => Ok(response),
    }
}
