//! Authenticated sessions for the OpTask web application
//!
//! Request flow: the session middleware resolves the signed session cookie
//! into a [`session::RequestContext`], protected routes pass through the
//! [`guard`], handlers may hand back a [`session::SessionUpdate`], and any path
//! outside the API prefixes falls through to the single-page application.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fallback;
pub mod guard;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod validation;

pub use config::AppConfig;
pub use error::{AuthError, AuthResult};
pub use routes::create_router;
pub use state::AppState;
