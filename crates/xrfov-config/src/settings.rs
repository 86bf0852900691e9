//! Process-level layer settings.
//!
//! Resolved once when the loader negotiates with the layer:
//! 1. Built-in defaults
//! 2. Environment variables (highest priority)

use std::path::PathBuf;

use crate::logging::LogLevel;

/// Directory holding the `<identity>.cfg` files (default: beside the module)
pub const HOME_ENV: &str = "XRFOV_HOME";
/// Directory receiving the log file (default: per-user local data dir)
pub const LOG_DIR_ENV: &str = "XRFOV_LOG_DIR";
/// `tracing_subscriber::EnvFilter` directives
pub const LOG_ENV: &str = "XRFOV_LOG";
/// Mirror every log line to stderr when set
pub const DEBUG_ENV: &str = "XRFOV_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSettings {
    /// Overrides the module directory as config home
    pub home: Option<PathBuf>,
    /// Overrides the per-user local data directory for the log file
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
    pub mirror_to_stderr: bool,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            home: None,
            log_dir: None,
            log_filter: Self::default_log_level().as_filter().to_string(),
            mirror_to_stderr: cfg!(debug_assertions),
        }
    }
}

impl LayerSettings {
    /// Defaults plus overrides from the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings
    }

    pub fn default_log_level() -> LogLevel {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }

    /// Apply environment variable overrides. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(home) = lookup(HOME_ENV) {
            self.home = Some(PathBuf::from(home));
        }
        if let Some(dir) = lookup(LOG_DIR_ENV) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup(LOG_ENV) {
            self.log_filter = filter;
        }
        if let Some(debug) = lookup(DEBUG_ENV) {
            self.mirror_to_stderr = !matches!(debug.as_str(), "0" | "false" | "off");
        }
    }

    /// Directory for the log file: the override, else the platform's
    /// per-user local data directory.
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(dirs::data_local_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = LayerSettings::default();
        assert!(settings.home.is_none());
        assert!(settings.log_dir.is_none());
        assert_eq!(
            settings.log_filter,
            LayerSettings::default_log_level().as_filter()
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = LayerSettings::default();
        settings.apply_env_overrides(env(&[
            (HOME_ENV, "/opt/fov"),
            (LOG_DIR_ENV, "/var/log/fov"),
            (LOG_ENV, "trace"),
            (DEBUG_ENV, "1"),
        ]));
        assert_eq!(settings.home, Some(PathBuf::from("/opt/fov")));
        assert_eq!(settings.log_dir(), Some(PathBuf::from("/var/log/fov")));
        assert_eq!(settings.log_filter, "trace");
        assert!(settings.mirror_to_stderr);
    }

    #[test]
    fn test_debug_can_be_disabled() {
        let mut settings = LayerSettings::default();
        settings.apply_env_overrides(env(&[(DEBUG_ENV, "off")]));
        assert!(!settings.mirror_to_stderr);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let mut settings = LayerSettings::default();
        settings.apply_env_overrides(env(&[(HOME_ENV, ""), (LOG_ENV, "")]));
        assert_eq!(settings, LayerSettings::default());
    }
}
