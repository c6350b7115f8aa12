//! TOML-based application configuration.
//!
//! Stores:
//! - Pomodoro phase lengths and the long-break cadence
//! - Defaults for new tasks
//! - An optional log filter override
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::task::CognitiveLoad;
use crate::timer::PhasePlan;

/// Timer-specific configuration, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerConfig {
    #[serde(default = "default_focus_duration")]
    pub focus_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
    #[serde(default = "default_pomodoros_before_long_break")]
    pub pomodoros_before_long_break: u32,
}

/// Defaults applied to tasks created from the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardConfig {
    #[serde(default = "default_estimate")]
    pub default_estimate: u32,
    #[serde(default)]
    pub default_cognitive_load: CognitiveLoad,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing` filter directive, used when `FOCUSBOARD_LOG` is unset.
    #[serde(default)]
    pub filter: String,
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_focus_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_pomodoros_before_long_break() -> u32 {
    4
}
fn default_estimate() -> u32 {
    crate::task::DEFAULT_ESTIMATE
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_duration: default_focus_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            pomodoros_before_long_break: default_pomodoros_before_long_break(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_estimate: default_estimate(),
            default_cognitive_load: CognitiveLoad::Medium,
        }
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
        key.split('.').try_fold(root, |current, part| current.get(part))
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

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                    .into(),
            ),
            serde_json::Value::Object(_) => return Err(unknown()),
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing the defaults if the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Ok(Self::load_from(&Self::path()?)?)
    }

    /// Like [`load`](Self::load) with an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
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

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), CoreError> {
        Ok(self.save_to(&Self::path()?)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning the defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a leaf value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type or range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Phase lengths for the pomodoro engine.
    pub fn phase_plan(&self) -> PhasePlan {
        PhasePlan {
            focus_min: self.timer.focus_duration,
            short_break_min: self.timer.short_break,
            long_break_min: self.timer.long_break,
            long_break_every: self.timer.pomodoros_before_long_break,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("timer.focus_duration", self.timer.focus_duration),
            ("timer.short_break", self.timer.short_break),
            ("timer.long_break", self.timer.long_break),
            (
                "timer.pomodoros_before_long_break",
                self.timer.pomodoros_before_long_break,
            ),
            ("board.default_estimate", self.board.default_estimate),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.timer.focus_duration, 25);
        assert_eq!(cfg.timer.short_break, 5);
        assert_eq!(cfg.timer.long_break, 15);
        assert_eq!(cfg.timer.pomodoros_before_long_break, 4);
        assert_eq!(cfg.board.default_estimate, 2);
        assert_eq!(cfg.phase_plan(), PhasePlan::default());
    }

    #[test]
    fn partial_file_gets_field_defaults() {
        let cfg: Config = toml::from_str("[timer]\nfocus_duration = 50\n").unwrap();
        assert_eq!(cfg.timer.focus_duration, 50);
        assert_eq!(cfg.timer.short_break, 5);
        assert_eq!(cfg.board.default_cognitive_load, CognitiveLoad::Medium);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.focus_duration").as_deref(), Some("25"));
        assert_eq!(cfg.get("board.default_cognitive_load").as_deref(), Some("medium"));
        assert!(cfg.get("timer.missing").is_none());
        assert!(cfg.get("timer").is_none());
    }

    #[test]
    fn set_updates_numbers_and_enums() {
        let mut cfg = Config::default();
        cfg.set("timer.short_break", "7").unwrap();
        cfg.set("board.default_cognitive_load", "high").unwrap();
        assert_eq!(cfg.timer.short_break, 7);
        assert_eq!(cfg.board.default_cognitive_load, CognitiveLoad::High);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timer.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("timer.focus_duration", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("timer.focus_duration", "0").is_err());
        assert!(cfg.set("board.default_cognitive_load", "extreme").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("log.filter", "focusboard_core=debug").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), changed);
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<_> = Config::default()
            .entries()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert!(keys.contains(&"timer.focus_duration".to_string()));
        assert!(keys.contains(&"board.default_estimate".to_string()));
        assert!(keys.contains(&"log.filter".to_string()));
    }
}
