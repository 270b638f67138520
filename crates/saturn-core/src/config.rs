use crate::error::{Result, SaturnError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "saturn.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// EvaluatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_ping_limit")]
    pub limit: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_ping_limit() -> u32 {
    60
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_ping_limit(),
            window_ms: default_window_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Minimum gap between two alerts for the same incident.
    #[serde(default = "default_suppress_secs")]
    pub suppress_secs: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_suppress_secs() -> u64 {
    300
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            suppress_secs: default_suppress_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub ping_rate_limit: RateLimitConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: u32,
    #[serde(default = "default_monitor_limit")]
    pub default_monitor_limit: u32,
}

fn default_site_url() -> String {
    "https://saturnmonitor.com".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_session_ttl_days() -> u32 {
    30
}

fn default_monitor_limit() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".saturn"),
            site_url: default_site_url(),
            port: default_port(),
            environment: default_environment(),
            evaluator: EvaluatorConfig::default(),
            ping_rate_limit: RateLimitConfig::default(),
            alerts: AlertConfig::default(),
            session_ttl_days: default_session_ttl_days(),
            default_monitor_limit: default_monitor_limit(),
        }
    }
}

impl Config {
    /// Read `<data_dir>/saturn.yaml` if present, otherwise use defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut cfg: Config = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&data)?
        } else {
            Config::default()
        };
        cfg.data_dir = data_dir.to_path_buf();
        Ok(cfg)
    }

    /// [`Config::load`] followed by process environment overrides.
    pub fn load_with_env(data_dir: &Path) -> Result<Self> {
        let mut cfg = Self::load(data_dir)?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Apply `SITE_URL`, `SATURN_PORT` and `SATURN_ENV` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("SITE_URL").filter(|v| !v.is_empty()) {
            self.site_url = url;
        }
        if let Some(port) = lookup("SATURN_PORT").filter(|v| !v.is_empty()) {
            self.port = port
                .parse()
                .map_err(|_| SaturnError::invalid("SATURN_PORT", format!("invalid port '{port}'")))?;
        }
        if let Some(env) = lookup("SATURN_ENV").filter(|v| !v.is_empty()) {
            self.environment = env;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// `site_url` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.session_ttl_days))
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("site_url '{}' is not an http(s) URL", self.site_url),
            });
        }
        if self.evaluator.interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "evaluator.interval_secs must be positive".to_string(),
            });
        }
        if self.ping_rate_limit.limit == 0 || self.ping_rate_limit.window_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "ping_rate_limit would reject every ping".to_string(),
            });
        }
        if self.alerts.retry_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "alerts.retry_attempts is 0, webhooks will never be sent".to_string(),
            });
        }
        if self.session_ttl_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "session_ttl_days must be positive".to_string(),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.site_url, "https://saturnmonitor.com");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.evaluator.interval_secs, 60);
        assert_eq!(cfg.ping_rate_limit, RateLimitConfig { limit: 60, window_ms: 60_000 });
        assert_eq!(cfg.alerts.retry_attempts, 3);
        assert_eq!(cfg.data_dir, dir.path());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "port: 8080\nalerts:\n  retry_attempts: 5\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.alerts.retry_attempts, 5);
        assert_eq!(cfg.alerts.retry_delay_ms, 1000);
        assert_eq!(cfg.session_ttl_days, 30);
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("SITE_URL", "https://status.example.com/"),
            ("SATURN_PORT", "4000"),
            ("SATURN_ENV", "production"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.port, 4000);
        assert!(cfg.is_production());
        assert_eq!(cfg.base_url(), "https://status.example.com");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env(|k| (k == "SATURN_PORT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SATURN_PORT"));
    }

    #[test]
    fn validate_flags_zero_interval() {
        let mut cfg = Config::default();
        cfg.evaluator.interval_secs = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }
}
