//! Session management
//!
//! [`SessionManager`] resolves the session presented by a request into a
//! [`RequestContext`] and, once the handler has run, applies the
//! [`SessionUpdate`] it returned (if any) and persists the result.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use chrono::{DateTime, Utc};
use std::{convert::Infallible, sync::Arc};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    config::SessionConfig,
    error::{AuthError, AuthResult},
    identity::IdentitySerializer,
    models::{SessionRecord, User},
    store::SessionStore,
};

/// Session state resolved for one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The stored session, or a freshly allocated one
    pub session: SessionRecord,
    /// Identity resolved from `session.identity_token`
    pub user: Option<User>,
    /// True when the session was allocated by this request
    pub is_new: bool,
}

impl RequestContext {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AuthError::Internal("Session middleware is not installed".to_string()))
    }
}

/// Session mutation requested by a handler.
///
/// Returned as part of the response, e.g. `(SessionUpdate::Logout, Json(body))`.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Bind the session to a verified identity
    Login(User),
    /// Drop the identity from the session
    Logout,
}

impl IntoResponseParts for SessionUpdate {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

/// Loads, updates and persists sessions
pub struct SessionManager {
    config: SessionConfig,
    store: Arc<dyn SessionStore>,
    identities: IdentitySerializer,
    key: Key,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn SessionStore>,
        identities: IdentitySerializer,
    ) -> AuthResult<Self> {
        // Key derivation needs the secret length checked by validate()
        config.validate()?;
        let key = Key::derive_from(config.secret.as_bytes());

        Ok(Self {
            config,
            store,
            identities,
            key,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Key the session cookie is signed with
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Resolve the session named by the request cookie.
    ///
    /// Unknown or expired ids, and requests without a cookie, get a new
    /// anonymous session that is not stored yet. A token whose user is gone
    /// leaves `user` unset. Store failures are returned as errors.
    pub async fn load(&self, session_id: Option<&str>) -> AuthResult<RequestContext> {
        let existing = match session_id {
            Some(id) => self.store.get(id).await?,
            None => None,
        };

        let (session, is_new) = match existing {
            Some(record) => (record, false),
            None => (SessionRecord::new(self.config.lifetime), true),
        };

        let user = match &session.identity_token {
            Some(token) => self.identities.deserialize(token).await?,
            None => None,
        };

        debug!(
            "Resolved session {} (new: {}, user: {:?})",
            session.log_id(),
            is_new,
            user.as_ref().map(|u| u.id)
        );

        Ok(RequestContext {
            session,
            user,
            is_new,
        })
    }

    /// Apply `update` and persist the session if anything changed.
    ///
    /// Returns the record to send back as a cookie, or `None` when the session
    /// was left untouched. Unmodified existing sessions are never rewritten.
    pub async fn commit(
        &self,
        ctx: RequestContext,
        update: Option<SessionUpdate>,
    ) -> AuthResult<Option<SessionRecord>> {
        let RequestContext {
            mut session,
            is_new,
            ..
        } = ctx;

        // Logging out of an anonymous session changes nothing
        let update = match update {
            Some(SessionUpdate::Logout) if !session.is_authenticated() => None,
            other => other,
        };

        match update {
            Some(SessionUpdate::Login(user)) => {
                let mut fresh = SessionRecord::new(self.config.lifetime);
                fresh.identity_token = Some(self.identities.serialize(&user));

                if !is_new {
                    self.store.delete(&session.session_id).await?;
                }
                self.store.put(&fresh).await?;

                info!("User {} logged in, session {}", user.id, fresh.log_id());
                Ok(Some(fresh))
            }
            Some(SessionUpdate::Logout) => {
                session.identity_token = None;
                self.store.put(&session).await?;

                info!("Logged out of session {}", session.log_id());
                Ok(Some(session))
            }
            None if is_new && self.config.save_uninitialized => {
                self.store.put(&session).await?;
                debug!("Saved new anonymous session {}", session.log_id());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Build the cookie carrying `record`'s id
    pub fn cookie_for(&self, record: &SessionRecord) -> Cookie<'static> {
        self.cookie_for_at(record, Utc::now())
    }

    /// Build the cookie for `record` as of `now`
    pub(crate) fn cookie_for_at(&self, record: &SessionRecord, now: DateTime<Utc>) -> Cookie<'static> {
        let max_age = i64::try_from(record.remaining_at(now).as_secs()).unwrap_or(i64::MAX);

        let mut cookie = Cookie::build((self.config.cookie_name.clone(), record.session_id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.cookie_secure)
            .max_age(time::Duration::seconds(max_age));

        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(record.expires_at.timestamp()) {
            cookie = cookie.expires(expires);
        }

        cookie.build()
    }
}
