use anyhow::Result;
use config::{Config, Environment};
use moka::future::Cache;
use sea_orm::{Database, DatabaseConnection};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;

/// Runtime tunables, read from `BUILDTRACK_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Lifetime of cached reports in seconds
    pub cache_ttl_secs: u64,
    /// Maximum number of cached reports
    pub cache_capacity: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cache_capacity: 1000,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Loads settings from the environment on top of the defaults.
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("cache_ttl_secs", defaults.cache_ttl_secs)?
            .set_default("cache_capacity", defaults.cache_capacity)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .add_source(Environment::with_prefix("BUILDTRACK").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn build_cache<K, V>(&self) -> Cache<K, V>
    where
        K: std::hash::Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Cache::builder()
            .max_capacity(self.cache_capacity)
            .time_to_live(Duration::from_secs(self.cache_ttl_secs))
            .build()
    }
}

/// Builds the application state around an existing connection.
pub fn app_state_from_connection(db: DatabaseConnection) -> Result<AppState> {
    let settings = Settings::load()?;
    let cache = settings.build_cache();
    Ok(AppState {
        db,
        cache,
        report_generations: Default::default(),
        settings,
    })
}

/// Connects to `database_url` and builds the application state.
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    info!("Connecting to database");
    let db = Database::connect(database_url).await?;
    app_state_from_connection(db)
}
