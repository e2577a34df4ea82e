use crate::auth::password::{Argon2Hasher, CredentialHasher};
use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;
use crate::recipes::repo::{PgRecipeRepo, RecipeRepo};
use crate::store::{memory::InMemoryStore, sessions::PgSessionStore};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub recipes: Arc<dyn RecipeRepo>,
    pub hasher: Arc<dyn CredentialHasher>,
    /// Present in Postgres mode; sessions are stored there too.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let hasher = Arc::new(Argon2Hasher::new(&config.password)?) as Arc<dyn CredentialHasher>;

        let Some(url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
            return Ok(Self::in_memory(config, hasher));
        };

        let pool = db::connect(&config, &url).await?;
        PgSessionStore::new(pool.clone())
            .spawn_cleanup(Duration::from_secs(config.session.cleanup_interval_secs));
        Ok(Self::postgres(config, hasher, pool))
    }

    pub fn postgres(config: Arc<AppConfig>, hasher: Arc<dyn CredentialHasher>, pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepo::new(pool.clone())),
            recipes: Arc::new(PgRecipeRepo::new(pool.clone())),
            config,
            hasher,
            db: Some(pool),
        }
    }

    pub fn in_memory(config: Arc<AppConfig>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            recipes: store,
            config,
            hasher,
            db: None,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::for_tests();
        let hasher = Arc::new(Argon2Hasher::new(&config.password).expect("test argon2 params"));
        Self::in_memory(Arc::new(config), hasher)
    }
}
