use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable that overrides `openweather.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable that overrides `server.bind`.
pub const BIND_ENV: &str = "WEATHER_WEBHOOK_BIND";

/// Credentials and endpoint for the OpenWeather REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenWeatherConfig {
    /// Per-request timeout. Zero falls back to the default.
    pub fn request_timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_string() }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [openweather]
/// api_key = "..."
///
/// [server]
/// bind = "0.0.0.0:8080"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub openweather: OpenWeatherConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-webhook")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.openweather.api_key = Some(key);
        }
        if let Some(bind) = non_empty(BIND_ENV) {
            self.server.bind = bind;
        }
    }

    /// Returns the OpenWeather API key or an error with a hint on how to set it.
    pub fn api_key(&self) -> Result<&str> {
        self.openweather
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `weather-webhook configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key().unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No OpenWeather API key configured"));
        assert!(msg.contains("weather-webhook configure"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());

        assert!(cfg.api_key().is_err());
    }

    #[test]
    fn set_api_key_is_returned() {
        let mut cfg = Config::default();
        cfg.set_api_key("OPEN_KEY".into());

        assert_eq!(cfg.api_key().expect("key must exist"), "OPEN_KEY");
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        let env: HashMap<&str, &str> =
            HashMap::from([(API_KEY_ENV, "FROM_ENV"), (BIND_ENV, "127.0.0.1:9000")]);
        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.api_key().unwrap(), "FROM_ENV");
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let mut cfg = Config::default();
        cfg.set_api_key("FROM_FILE".into());

        cfg.apply_overrides(|_| Some(String::new()));

        assert_eq!(cfg.api_key().unwrap(), "FROM_FILE");
        assert_eq!(cfg.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg: Config = toml::from_str("[openweather]\napi_key = \"abc\"\n").unwrap();

        assert_eq!(cfg.api_key().unwrap(), "abc");
        assert_eq!(cfg.openweather.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            cfg.openweather.request_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(cfg.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn zero_timeout_uses_default() {
        let cfg: Config = toml::from_str("[openweather]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(
            cfg.openweather.request_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );

        let cfg: Config = toml::from_str("[openweather]\ntimeout_secs = 3\n").unwrap();
        assert_eq!(cfg.openweather.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("SAVED".into());
        cfg.server.bind = "127.0.0.1:3000".into();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key().unwrap(), "SAVED");
        assert_eq!(loaded.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.openweather.api_key.is_none());
    }
}
