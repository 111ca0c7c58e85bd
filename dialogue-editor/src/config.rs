use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Emotion locales the service offers
pub const EMOTION_LOCALES: [&str; 2] = ["chinese", "english"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the dialogue service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Which of the catalog's emotion lists to offer
    #[serde(default = "default_emotion_locale")]
    pub emotion_locale: String,

    /// Per-request timeout; whole-project generation can take minutes
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where downloaded audio is written when no path is given
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_emotion_locale() -> String {
    "chinese".to_string()
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_download_dir() -> String {
    ".".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            emotion_locale: default_emotion_locale(),
            request_timeout_secs: default_request_timeout_secs(),
            download_dir: default_download_dir(),
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 4] = [
        "server_url",
        "emotion_locale",
        "request_timeout_secs",
        "download_dir",
    ];

    /// Get the config directory path.
    ///
    /// Can be overridden via the `DIALOGUE_EDITOR_CONFIG_DIR` environment
    /// variable, which keeps tests away from the user's real config.
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(override_dir) = std::env::var("DIALOGUE_EDITOR_CONFIG_DIR") {
            return Ok(PathBuf::from(override_dir));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("cli-programs"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("dialogue-editor.toml"))
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = path
            .parent()
            .context("Config path has no parent directory")?;

        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Update one setting from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "server_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    bail!("server_url must start with http:// or https://");
                }
                self.server_url = value.trim_end_matches('/').to_string();
            }
            "emotion_locale" => {
                if !EMOTION_LOCALES.contains(&value) {
                    bail!(
                        "emotion_locale must be one of: {}",
                        EMOTION_LOCALES.join(", ")
                    );
                }
                self.emotion_locale = value.to_string();
            }
            "request_timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {}", value))?;
                if secs == 0 {
                    bail!("request_timeout_secs must be greater than zero");
                }
                self.request_timeout_secs = secs;
            }
            "download_dir" => {
                if value.is_empty() {
                    bail!("download_dir must not be empty");
                }
                self.download_dir = value.to_string();
            }
            _ => bail!(
                "Unknown config key '{}' (expected one of: {})",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }
}
