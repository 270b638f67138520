use std::sync::Arc;
use std::time::Duration;

use saturn_core::config::Config;
use saturn_core::rate_limit::RateLimiter;
use saturn_core::store::Store;

/// Outbound webhook requests give up after this long.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub ping_limiter: Arc<RateLimiter>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .user_agent(saturn_core::webhook::USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            ping_limiter: Arc::new(RateLimiter::new()),
            http_client,
        }
    }

    /// Open the store under `config.data_dir`.
    pub fn open(config: Config) -> saturn_core::Result<Self> {
        let store = Store::open_in(&config.data_dir)?;
        Ok(Self::new(store, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_database_in_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let state = AppState::open(config).unwrap();
        assert!(dir.path().join(saturn_core::store::DB_FILE).exists());
        assert_eq!(state.config.port, 3000);
    }
}
