use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MailSettings {
    /// HTTP mail relay endpoint; when empty, dispatches are only logged
    #[serde(default)]
    pub relay_url: String,

    #[serde(default)]
    pub from_address: String,

    #[serde(default)]
    pub timeout_secs: u64,

    /// How long a reset request waits on the dispatch outcome before answering
    #[serde(default)]
    pub response_wait_ms: u64,
}

impl MailSettings {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            relay_url: String::new(),
            from_address: "no-reply@localhost".to_string(),
            timeout_secs: 10,
            response_wait_ms: 1_500,
        }
    }
}
