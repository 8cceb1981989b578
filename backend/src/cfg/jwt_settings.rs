use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtSettings {
    #[serde(default)]
    pub session_token_expiry: i64, // In seconds (e.g., 24 hours = 86400)
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            session_token_expiry: 24 * 60 * 60, // 24 hours
        }
    }
}
