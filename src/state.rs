use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::ai::AiService;
use crate::config::AppConfig;
use crate::ratelimit::SlidingWindowLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub ai: Arc<AiService>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database_url).await?;
        let limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        ));
        let ai = Arc::new(AiService::from_config(&config.ai)?);
        Ok(Self {
            db,
            config,
            limiter,
            ai,
        })
    }
}
