//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::SessionConfig,
    credentials::CredentialVerifier,
    error::AuthResult,
    identity::IdentitySerializer,
    repositories::UserDirectory,
    session::SessionManager,
    store::SessionStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub verifier: CredentialVerifier,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wire the session subsystem from its collaborators
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> AuthResult<Self> {
        let identities = IdentitySerializer::new(users.clone());
        let sessions = SessionManager::new(config, store, identities)?;

        Ok(Self {
            sessions: Arc::new(sessions),
            verifier: CredentialVerifier::new(users.clone()),
            users,
        })
    }
}
