//! Configuration management for pricewatch.
//!
//! Configuration is read from `~/.config/pricewatch/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Secrets may also come from the environment, which wins over the file.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::dispatcher::DEFAULT_DASHBOARD_URL;
use crate::notify::whatsapp::TWILIO_API_BASE;

pub const ENV_EMAIL_API_KEY: &str = "PRICEWATCH_EMAIL_API_KEY";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_WHATSAPP_NUMBER: &str = "TWILIO_WHATSAPP_NUMBER";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub email: EmailConfig,
    pub whatsapp: WhatsAppConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `<data_dir>/pricewatch/pricewatch.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub program: String,
    pub script_path: String,
    /// Wall-clock limit per run. 0 disables it.
    pub timeout_secs: u64,
    /// Mode argument passed for headless scrapes.
    pub headless_arg: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script_path: "python_scraper/scraper.py".to_string(),
            timeout_secs: 300,
            headless_arg: "headless".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub dashboard_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: None,
            from: "pricewatch <noreply@localhost>".to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }
}

impl EmailConfig {
    /// The key to send with, if real delivery is possible.
    pub fn credentials(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_base: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }
}

impl WhatsAppConfig {
    pub fn is_configured(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from_number]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl Config {
    /// Load configuration from the default path, then apply environment
    /// overrides.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path, writing the commented default if missing.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/pricewatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("pricewatch").join("config.toml"))
    }

    /// Overlay secrets from the environment. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_EMAIL_API_KEY) {
            self.email.api_key = Some(key);
        }
        if let Some(sid) = get(ENV_TWILIO_ACCOUNT_SID) {
            self.whatsapp.account_sid = Some(sid);
        }
        if let Some(token) = get(ENV_TWILIO_AUTH_TOKEN) {
            self.whatsapp.auth_token = Some(token);
        }
        if let Some(number) = get(ENV_TWILIO_WHATSAPP_NUMBER) {
            self.whatsapp.from_number = Some(number);
        }
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# pricewatch configuration
#
# Secrets can also be supplied through the environment:
#   PRICEWATCH_EMAIL_API_KEY, TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN,
#   TWILIO_WHATSAPP_NUMBER

[database]
# SQLite file. Defaults to <data dir>/pricewatch/pricewatch.db
# path = "/var/lib/pricewatch/pricewatch.db"

[worker]
# Interpreter and script for the scraping worker
program = "python3"
script_path = "python_scraper/scraper.py"

# Kill the worker after this many seconds (0 = no limit)
timeout_secs = 300

# Mode argument for headless scrapes. The bundled Python worker only starts
# its browser for "selenium".
headless_arg = "headless"

[email]
enabled = true
api_url = "https://api.resend.com/emails"
# Without an API key emails are only logged
# api_key = ""
from = "pricewatch <noreply@localhost>"
dashboard_url = "http://localhost:3000/dashboard"

[whatsapp]
# Twilio credentials for WhatsApp delivery
# account_sid = ""
# auth_token = ""
# from_number = "+14155238886"
api_base = "https://api.twilio.com"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config.worker.program, "python3");
        assert_eq!(config.worker.headless_arg, "headless");
        assert_eq!(config.worker.timeout(), Some(Duration::from_secs(300)));
        assert!(config.email.credentials().is_none());
        assert!(!config.whatsapp.is_configured());
        assert_eq!(config.whatsapp.api_base, TWILIO_API_BASE);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[worker]
timeout_secs = 0
headless_arg = "selenium"

[email]
api_key = "re_123"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.worker.timeout(), None);
        assert_eq!(config.worker.script_path, "python_scraper/scraper.py");
        assert_eq!(config.worker.headless_arg, "selenium");
        assert_eq!(config.email.credentials(), Some("re_123"));
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_disabled_email_has_no_credentials() {
        let content = "[email]\nenabled = false\napi_key = \"re_123\"\n";
        let config: Config = toml::from_str(content).unwrap();
        assert!(config.email.credentials().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_EMAIL_API_KEY, "from-env"),
            (ENV_TWILIO_ACCOUNT_SID, "AC1"),
            (ENV_TWILIO_AUTH_TOKEN, "tok"),
            (ENV_TWILIO_WHATSAPP_NUMBER, "+1555"),
        ]
        .into_iter()
        .collect();

        let mut config: Config = toml::from_str("[email]\napi_key = \"from-file\"\n").unwrap();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.email.api_key.as_deref(), Some("from-env"));
        assert!(config.whatsapp.is_configured());
    }

    #[test]
    fn test_empty_env_value_ignored() {
        let mut config: Config = toml::from_str("[email]\napi_key = \"from-file\"\n").unwrap();
        config.apply_env_overrides(|k| (k == ENV_EMAIL_API_KEY).then(String::new));
        assert_eq!(config.email.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.worker.timeout_secs, 300);

        fs::write(&path, "[worker]\nprogram = \"python\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.worker.program, "python");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[worker\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
