use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub login_route: String,
    pub home_route: String,
    pub watch_interval_ms: u64,
}

impl PanelConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("HOTEL_API_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = env::var("HOTEL_API_TIMEOUT_SECS") {
            self.api.timeout_secs = positive_or("HOTEL_API_TIMEOUT_SECS", &v, self.api.timeout_secs);
        }

        if let Ok(v) = env::var("HOTEL_LOGIN_ROUTE") {
            self.session.login_route = v;
        }
        if let Ok(v) = env::var("HOTEL_HOME_ROUTE") {
            self.session.home_route = v;
        }
        if let Ok(v) = env::var("HOTEL_SESSION_WATCH_MS") {
            self.session.watch_interval_ms =
                positive_or("HOTEL_SESSION_WATCH_MS", &v, self.session.watch_interval_ms);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:5000/".to_string(),
                timeout_secs: 30,
            },
            session: SessionConfig {
                login_route: "/login".to_string(),
                home_route: "/dashboard".to_string(),
                watch_interval_ms: 500,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://admin.hotel.example.com/".to_string(),
                timeout_secs: 10,
            },
            session: SessionConfig {
                login_route: "/login".to_string(),
                home_route: "/dashboard".to_string(),
                watch_interval_ms: 2000,
            },
        }
    }
}

/// Parse a duration setting. Zero and garbage keep `current`; a zero
/// interval would stall the token watcher.
fn positive_or(name: &str, raw: &str, current: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!("Ignoring {}={:?}, expected a positive integer", name, raw);
            current
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized on first access
pub static CONFIG: Lazy<PanelConfig> = Lazy::new(PanelConfig::from_env);

pub fn config() -> &'static PanelConfig {
    &CONFIG
}
