use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;
use crate::reports::chart::{ChartRenderer, EChartsRenderer};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub charts: Arc<dyn ChartRenderer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config).await?;
        let charts = Arc::new(EChartsRenderer) as Arc<dyn ChartRenderer>;
        Ok(Self::from_parts(db, config, charts))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, charts: Arc<dyn ChartRenderer>) -> Self {
        Self { db, config, charts }
    }
}
