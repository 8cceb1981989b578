use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProvisioningSettings {
    #[serde(default)]
    pub default_currency: String,

    #[serde(default)]
    pub default_timezone: String,

    #[serde(default)]
    pub default_locale: String,

    #[serde(default)]
    pub defaults_timeout_secs: u64,
}

impl ProvisioningSettings {
    #[must_use]
    pub const fn defaults_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults_timeout_secs)
    }
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            default_timezone: "UTC".to_string(),
            default_locale: "en-US".to_string(),
            defaults_timeout_secs: 10,
        }
    }
}
