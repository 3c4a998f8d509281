//! Service configuration, read from the environment at startup

use chrono::Duration;
use std::{env, path::PathBuf};

use crate::error::{AuthError, AuthResult};

/// Seven days
pub const DEFAULT_SESSION_LIFETIME_SECONDS: u32 = 7 * 24 * 60 * 60;

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "optask.sid";

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Where session records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> AuthResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AuthError::Configuration(format!(
                "Unknown SESSION_STORE backend: {}",
                other
            ))),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Secret the session cookie is signed with
    pub secret: String,
    /// Cookie name
    pub cookie_name: String,
    /// Fixed lifetime of a session, counted from its creation
    pub lifetime: Duration,
    /// Persist and send a cookie for sessions nobody has logged into
    pub save_uninitialized: bool,
    /// Mark the cookie `Secure`
    pub cookie_secure: bool,
    /// Session store backend
    pub store: StoreBackend,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: cookie signing secret, at least 32 bytes (required)
    /// - `SESSION_COOKIE_NAME`: cookie name (default: "optask.sid")
    /// - `SESSION_LIFETIME_SECONDS`: session lifetime (default: 604800, 7 days)
    /// - `SESSION_SAVE_UNINITIALIZED`: store anonymous sessions (default: true)
    /// - `SESSION_COOKIE_SECURE`: set the `Secure` attribute (default: false)
    /// - `SESSION_STORE`: "redis" or "memory" (default: "redis")
    pub fn from_env() -> AuthResult<Self> {
        let secret = env::var("SESSION_SECRET").map_err(|_| {
            AuthError::Configuration("SESSION_SECRET environment variable not set".to_string())
        })?;

        let cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string());

        let lifetime_seconds: u32 = env::var("SESSION_LIFETIME_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SESSION_LIFETIME_SECONDS);

        let save_uninitialized = parse_flag("SESSION_SAVE_UNINITIALIZED", true);
        let cookie_secure = parse_flag("SESSION_COOKIE_SECURE", false);

        let store = match env::var("SESSION_STORE") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Redis,
        };

        let config = SessionConfig {
            secret,
            cookie_name,
            lifetime: Duration::seconds(i64::from(lifetime_seconds)),
            save_uninitialized,
            cookie_secure,
            store,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check invariants that cannot be expressed in the types
    pub fn validate(&self) -> AuthResult<()> {
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::Configuration(format!(
                "SESSION_SECRET must be at least {} bytes long",
                MIN_SECRET_LENGTH
            )));
        }

        if self.cookie_name.is_empty() {
            return Err(AuthError::Configuration(
                "SESSION_COOKIE_NAME must not be empty".to_string(),
            ));
        }

        if self.lifetime <= Duration::zero() {
            return Err(AuthError::Configuration(
                "SESSION_LIFETIME_SECONDS must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Defaults with the given secret, for tests and embedding
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            lifetime: Duration::seconds(i64::from(DEFAULT_SESSION_LIFETIME_SECONDS)),
            save_uninitialized: true,
            cookie_secure: false,
            store: StoreBackend::Memory,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: String,
    /// Directory holding the built single-page application
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SERVER_ADDR`: listen address (default: "0.0.0.0:3000")
    /// - `STATIC_DIR`: SPA build directory (default: "frontend/build")
    pub fn from_env() -> AuthResult<Self> {
        let addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("frontend/build"));

        Ok(ServerConfig { addr, static_dir })
    }
}

/// Everything the service reads at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> AuthResult<Self> {
        Ok(AppConfig {
            session: SessionConfig::from_env()?,
            server: ServerConfig::from_env()?,
        })
    }
}

fn parse_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
