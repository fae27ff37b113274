//! TOML-based application configuration.
//!
//! Stores:
//! - Break cadence and prompt preferences
//! - Pause-in-listed-apps settings
//! - Notification and overlay presentation flags
//! - Enabled / auto-start flags
//!
//! Configuration is stored at `~/.config/restcue/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{parse_postpone_durations_or_empty, BreakPreferences};

pub const MAX_OVERLAY_TRANSPARENCY_PERCENT: u8 = 90;

/// Flags stored next to the break preferences.
///
/// The engine never reads these; the scheduler and the presentation layer do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auto_start_on_boot: bool,
    /// Pause while one of `monitored_apps` is in the foreground.
    #[serde(default)]
    pub pause_in_listed_apps: bool,
    /// Comma separated application identifiers.
    #[serde(default)]
    pub monitored_apps: String,
    #[serde(default)]
    pub persistent_notification_enabled: bool,
    #[serde(default = "default_notification_update_seconds")]
    pub persistent_notification_update_seconds: u32,
    #[serde(default = "default_overlay_transparency")]
    pub overlay_transparency_percent: u8,
    #[serde(default)]
    pub overlay_background_uri: String,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub exclude_from_recents: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/restcue/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub breaks: BreakPreferences,
    #[serde(default)]
    pub app: AppSettings,
}

fn default_true() -> bool {
    true
}
fn default_notification_update_seconds() -> u32 {
    60
}
fn default_overlay_transparency() -> u8 {
    28
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_start_on_boot: false,
            pause_in_listed_apps: false,
            monitored_apps: String::new(),
            persistent_notification_enabled: false,
            persistent_notification_update_seconds: default_notification_update_seconds(),
            overlay_transparency_percent: default_overlay_transparency(),
            overlay_background_uri: String::new(),
            onboarding_completed: false,
            exclude_from_recents: false,
        }
    }
}

impl AppSettings {
    /// Clamp presentation values into their accepted ranges.
    pub fn sanitized(mut self) -> Self {
        self.overlay_transparency_percent = self
            .overlay_transparency_percent
            .min(MAX_OVERLAY_TRANSPARENCY_PERCENT);
        self.persistent_notification_update_seconds =
            self.persistent_notification_update_seconds.clamp(1, 600);
        self
    }

    /// Monitored app identifiers, trimmed, without empties.
    pub fn monitored_app_list(&self) -> Vec<&str> {
        self.monitored_apps
            .split(|c: char| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether a foreground app should pause the countdown.
    pub fn should_pause_for_app(&self, app_id: &str) -> bool {
        self.pause_in_listed_apps && self.monitored_app_list().contains(&app_id)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .trim()
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Array(_) if part == "postpone_for" => {
                        let durations = parse_postpone_durations_or_empty(value);
                        if durations.is_empty() {
                            return Err(invalid(format!("no positive durations in '{value}'")));
                        }
                        serde_json::Value::from(durations)
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg.sanitized())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        *self = updated.sanitized();
        Ok(())
    }

    /// Set a config value by key and persist to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn sanitized(self) -> Self {
        Self {
            breaks: self.breaks.sanitized(),
            app: self.app.sanitized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("app.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("breaks.small_every").as_deref(), Some("1200"));
        let offers = cfg.get("breaks.postpone_for");
        assert_eq!(offers.as_deref(), Some("[60,300,600,1800]"));
        assert!(cfg.get("app.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_value_updates_nested_number_and_bool() {
        let mut cfg = Config::default();
        cfg.set_value("breaks.small_every", "600").unwrap();
        cfg.set_value("breaks.top_flash_enabled", "false").unwrap();
        assert_eq!(cfg.breaks.small_every, 600);
        assert!(!cfg.breaks.top_flash_enabled);
    }

    #[test]
    fn set_value_normalizes_postpone_offers() {
        let mut cfg = Config::default();
        cfg.set_value("breaks.postpone_for", " 300，60,  60,900 ").unwrap();
        assert_eq!(cfg.breaks.postpone_for, vec![60, 300, 900]);
    }

    #[test]
    fn set_value_rejects_empty_postpone_offers() {
        let mut cfg = Config::default();
        let err = cfg.set_value("breaks.postpone_for", "，,0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.breaks.postpone_for, vec![60, 300, 600, 1800]);
    }

    #[test]
    fn set_value_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("app.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("app.enabled", "not_a_bool"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set_value("breaks.small_every", "-3").is_err());
    }

    #[test]
    fn set_value_clamps_overlay_transparency() {
        let mut cfg = Config::default();
        cfg.set_value("app.overlay_transparency_percent", "100").unwrap();
        assert_eq!(
            cfg.app.overlay_transparency_percent,
            MAX_OVERLAY_TRANSPARENCY_PERCENT
        );
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.set_value("breaks.big_after", "4").unwrap();
        cfg.set_value("app.monitored_apps", "org.video, org.game").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.breaks.big_after, 4);
        let apps = loaded.app.monitored_app_list();
        assert_eq!(apps, vec!["org.video", "org.game"]);
    }

    #[test]
    fn load_from_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[breaks]\nsmall_every = 300\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.breaks.small_every, 300);
        assert_eq!(cfg.breaks.small_for, 20);
        assert!(cfg.app.enabled);
    }

    #[test]
    fn load_from_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "breaks = 3 = 4").unwrap();
        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn pause_for_app_requires_flag_and_listing() {
        let mut app = AppSettings {
            monitored_apps: "org.video,org.game".into(),
            ..Default::default()
        };
        assert!(!app.should_pause_for_app("org.video"));
        app.pause_in_listed_apps = true;
        assert!(app.should_pause_for_app("org.video"));
        assert!(!app.should_pause_for_app("org.mail"));
    }
}
