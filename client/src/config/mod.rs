//! Configuration management
//!
//! Everything in the file is optional; command-line flags override it.

use anyhow::{Context, Result};
use protocol::crypto::Encryption;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Growl server hostname
    #[serde(default = "default_host")]
    pub host: String,
    /// Application name to register under
    #[serde(default = "default_application")]
    pub application: String,
    /// Wire protocol: "gntp" or "udp"
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared password
    #[serde(default)]
    pub password: Option<String>,
    /// GNTP body encryption: "none", "des", "3des" or "aes"
    #[serde(default = "default_encryption")]
    pub encryption: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_application() -> String {
    "growlnotify".to_string()
}

fn default_protocol() -> String {
    "gntp".to_string()
}

fn default_encryption() -> String {
    "none".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            password: None,
            encryption: default_encryption(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            host: default_host(),
            application: default_application(),
            protocol: default_protocol(),
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it does
    /// not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parses the configured encryption mode name.
    pub fn encryption(&self) -> Result<Encryption> {
        Encryption::from_token(&self.auth.encryption.to_uppercase())
            .with_context(|| format!("Unknown encryption mode: {}", self.auth.encryption))
    }
}
