use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Connection settings for the remote match-night service
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl ApiSettings {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            base_url,
            timeout_secs,
            username: None,
            password: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash, so paths can be appended verbatim
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn credentials(&self) -> Option<(String, SecretString)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        }
    }
}
