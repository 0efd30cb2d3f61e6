use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default server when nothing is configured; matches the development
/// server's bind address.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the streaming chat server
    pub server_url: String,

    /// Threadline home directory (config file and log live here)
    #[serde(skip)]
    pub home: PathBuf,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show the current thread id in the status line
    pub show_thread_id: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_thread_id: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: DEFAULT_SERVER_URL.to_string(),
            home: default_home(),
            ui: UiConfig::default(),
        }
    }
}

fn default_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".threadline")
}

impl Config {
    /// Load configuration from `~/.threadline/config.toml`, falling back to
    /// defaults when the file is absent. `THREADLINE_SERVER` overrides the
    /// configured server URL.
    pub fn load() -> Result<Self> {
        let home = default_home();
        fs::create_dir_all(&home).context("Failed to create .threadline directory")?;

        let config_path = home.join("config.toml");
        let mut config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = home;
        if let Ok(server) = std::env::var("THREADLINE_SERVER") {
            if !server.trim().is_empty() {
                config.server_url = server;
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save(&self) -> Result<()> {
        let config_path = self.home.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Where diagnostic logs go; kept out of the terminal so they never
    /// corrupt the TUI.
    pub fn log_path(&self) -> PathBuf {
        self.home.join("threadline.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config_file() {
        let config: Config = toml::from_str(
            r#"
            server_url = "http://chat.example.com:9000"

            [ui]
            show_thread_id = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url, "http://chat.example.com:9000");
        assert!(!config.ui.show_thread_id);
    }

    #[test]
    fn ui_section_is_optional() {
        let config: Config = toml::from_str(r#"server_url = "http://localhost:8000""#).unwrap();
        assert!(config.ui.show_thread_id);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server_url, DEFAULT_SERVER_URL);
    }
}
