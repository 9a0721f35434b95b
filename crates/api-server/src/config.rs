use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Largest threshold an operator may set, W/(m·K).
pub const MAX_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub admin_pin: String,
    /// Initial compliance threshold, W/(m·K)
    pub default_threshold: f64,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
    pub pin_max_failures: u32,
    pub pin_failure_window: Duration,
    pub pin_lockout: Duration,
    /// Prediction records kept for `/admin/history`
    pub history_capacity: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse()
            .context("PORT must be a port number")?;
        let admin_pin = env::var("ADMIN_PIN").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_PIN not set, using the default PIN");
            defaults.admin_pin.clone()
        });
        let default_threshold: f64 = env::var("DEFAULT_THRESHOLD")
            .unwrap_or_else(|_| defaults.default_threshold.to_string())
            .parse()
            .context("DEFAULT_THRESHOLD must be a number")?;
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);
        let pin_max_failures = env::var("PIN_MAX_FAILURES")
            .unwrap_or_else(|_| defaults.pin_max_failures.to_string())
            .parse()
            .context("PIN_MAX_FAILURES must be a positive integer")?;
        let window_secs: u64 = env::var("PIN_FAILURE_WINDOW_SECS")
            .unwrap_or_else(|_| defaults.pin_failure_window.as_secs().to_string())
            .parse()
            .context("PIN_FAILURE_WINDOW_SECS must be a number of seconds")?;
        let lockout_secs: u64 = env::var("PIN_LOCKOUT_SECS")
            .unwrap_or_else(|_| defaults.pin_lockout.as_secs().to_string())
            .parse()
            .context("PIN_LOCKOUT_SECS must be a number of seconds")?;

        let history_capacity: usize = env::var("HISTORY_CAPACITY")
            .unwrap_or_else(|_| defaults.history_capacity.to_string())
            .parse()
            .context("HISTORY_CAPACITY must be a positive integer")?;
        if history_capacity == 0 {
            bail!("HISTORY_CAPACITY must be at least 1");
        }

        if !is_valid_threshold(default_threshold) {
            bail!(
                "DEFAULT_THRESHOLD must be in (0, {}], got {}",
                MAX_THRESHOLD,
                default_threshold
            );
        }

        Ok(Self {
            host,
            port,
            admin_pin,
            default_threshold,
            cors_origins,
            pin_max_failures,
            pin_failure_window: Duration::from_secs(window_secs),
            pin_lockout: Duration::from_secs(lockout_secs),
            history_capacity,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            admin_pin: "1234".to_string(),
            default_threshold: 0.045,
            cors_origins: vec!["*".to_string()],
            pin_max_failures: 5,
            pin_failure_window: Duration::from_secs(300),
            pin_lockout: Duration::from_secs(900),
            history_capacity: 1000,
        }
    }
}

pub fn is_valid_threshold(threshold: f64) -> bool {
    threshold > 0.0 && threshold <= MAX_THRESHOLD
}
