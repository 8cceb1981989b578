use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub max_connections: u32,

    #[serde(default)]
    pub run_migrations_on_startup: bool,

    #[serde(default)]
    pub resilience: ResilienceSettings,
}

/// Retry and health-check tuning for the data-access layer
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResilienceSettings {
    /// Total attempts per operation, including the first one
    #[serde(default)]
    pub max_attempts: u32,

    #[serde(default)]
    pub attempt_timeout_ms: u64,

    /// Deadline spanning all attempts of one operation
    #[serde(default)]
    pub overall_deadline_ms: u64,

    #[serde(default)]
    pub initial_backoff_ms: u64,

    #[serde(default)]
    pub max_backoff_ms: u64,

    /// Delay before the single re-initialization attempt of an unhealthy pool
    #[serde(default)]
    pub reinit_delay_ms: u64,
}

impl ResilienceSettings {
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    #[must_use]
    pub const fn overall_deadline(&self) -> Duration {
        Duration::from_millis(self.overall_deadline_ms)
    }

    #[must_use]
    pub const fn reinit_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_delay_ms)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:db.sqlite".to_string(),
            max_connections: 5,
            run_migrations_on_startup: true,
            resilience: ResilienceSettings::default(),
        }
    }
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 2_000,
            overall_deadline_ms: 6_000,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            reinit_delay_ms: 2_000,
        }
    }
}
