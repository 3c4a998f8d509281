use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::{
    AppConfig, AppState,
    config::StoreBackend,
    create_router,
    fallback::SpaShell,
    repositories::{UserDirectory, UserRepository},
    store::{MemorySessionStore, RedisSessionStore, SessionStore},
};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may be set directly
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting OpTask session service");

    let config = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let user_repository = UserRepository::new(pool);
    user_repository.ensure_schema().await?;
    let users: Arc<dyn UserDirectory> = Arc::new(user_repository);

    let store: Arc<dyn SessionStore> = match config.session.store {
        StoreBackend::Redis => {
            let redis_config = RedisConfig::from_env()?;
            let redis_pool = RedisPool::new(&redis_config).await?;
            if !redis_pool.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }
            info!("Using Redis session store");
            Arc::new(RedisSessionStore::new(redis_pool))
        }
        StoreBackend::Memory => {
            info!("Using in-memory session store");
            Arc::new(MemorySessionStore::new())
        }
    };

    let app_state = AppState::new(config.session.clone(), store, users)?;
    let app = create_router(app_state, SpaShell::new(config.server.static_dir.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    info!("OpTask listening on {}", config.server.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
