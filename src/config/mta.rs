//! Mail transfer agent settings (`_mta.yml`).
//!
//! ```yaml
//! host: smtp.example.com
//! port: 465
//! ssl: true
//! user: monitor
//! password: secret
//! from: monitor@example.com
//! receivers: [ops@example.com]
//! ```

use std::path::Path;

use serde::Deserialize;

use super::constants::{DEFAULT_MAIL_SUBJECT, DEFAULT_SMTP_PORT};
use crate::error_handling::ConfigError;

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_subject() -> String {
    DEFAULT_MAIL_SUBJECT.to_string()
}

/// SMTP connection and sender settings.
///
/// `ssl` connects over implicit TLS, `tls` upgrades a plain connection with
/// STARTTLS; with neither the connection stays unencrypted. Credentials are
/// only sent when both `user` and `password` are set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MtaConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub tls: bool,
    pub from: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Fallback receivers for alarm levels without `mail` entries
    #[serde(default)]
    pub receivers: Vec<String>,
}

impl MtaConfig {
    /// Reads `_mta.yml`.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable or `host`/`from` are missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::InvalidField {
            field: "mta".into(),
            message: e.to_string(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}
