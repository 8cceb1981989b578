use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecoverySettings {
    #[serde(default)]
    pub reset_token_expiry: i64, // In seconds (e.g., 1 hour = 3600)

    /// Page that receives the raw reset secret as the `token` query parameter
    #[serde(default)]
    pub link_base_url: String,

    #[serde(default)]
    pub min_password_length: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            reset_token_expiry: 60 * 60, // 1 hour
            link_base_url: "http://localhost:3000/reset-password".to_string(),
            min_password_length: 6,
        }
    }
}
