//! Route guard: who may reach a handler

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

use crate::{error::AuthError, session::RequestContext};

/// Access requirement of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthenticated,
}

/// Outcome of [`authorize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Reject(Rejection),
}

/// Public routes are always allowed; protected routes need a resolved user.
pub fn authorize(ctx: &RequestContext, class: RouteClass) -> Access {
    match class {
        RouteClass::Public => Access::Allow,
        RouteClass::Protected if ctx.user.is_some() => Access::Allow,
        RouteClass::Protected => Access::Reject(Rejection::Unauthenticated),
    }
}

impl From<Rejection> for AuthError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthenticated => AuthError::Unauthenticated,
        }
    }
}

/// [`authorize`] against the [`RequestContext`] the session middleware
/// attached. A request without one has no user.
pub fn authorize_request(req: &Request, class: RouteClass) -> Access {
    match req.extensions().get::<RequestContext>() {
        Some(ctx) => authorize(ctx, class),
        None if class == RouteClass::Public => Access::Allow,
        None => Access::Reject(Rejection::Unauthenticated),
    }
}

/// Middleware for protected routes. Runs after the session middleware.
pub async fn require_authenticated(req: Request, next: Next) -> Result<Response, AuthError> {
    match authorize_request(&req, RouteClass::Protected) {
        Access::Allow => Ok(next.run(req).await),
        Access::Reject(rejection) => {
            debug!("Rejected request to {}: {:?}", req.uri().path(), rejection);
            Err(rejection.into())
        }
    }
}
