//! Structured logging for the FOV modifier layer.
//!
//! Two independent sinks are installed:
//! - an append-only file `<layer name>.log` in the per-user local data
//!   directory (or `XRFOV_LOG_DIR`), written synchronously, one line per event
//! - a debug mirror on stderr, enabled by `XRFOV_DEBUG` or in debug builds
//!
//! # Usage
//!
//! ```ignore
//! use xrfov_config::log_negotiate_info;
//!
//! log_negotiate_info!("Layer is active", layer = LAYER_NAME);
//! ```

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::settings::LayerSettings;

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const NEGOTIATE: &'static str = "NEGOTIATE";
    pub const INSTANCE: &'static str = "INSTANCE";
    pub const RESOLVE: &'static str = "RESOLVE";
    pub const VIEWS: &'static str = "VIEWS";
    pub const CONFIG: &'static str = "CONFIG";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log file init error: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
    #[error("subscriber init error: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

// === NEGOTIATE logging macros ===

#[macro_export]
macro_rules! log_negotiate_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(
            component = $crate::logging::Component::NEGOTIATE,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_negotiate_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            component = $crate::logging::Component::NEGOTIATE,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_negotiate_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(
            component = $crate::logging::Component::NEGOTIATE,
            $($key = $value,)*
            $msg
        )
    };
}

// === INSTANCE logging macros ===

#[macro_export]
macro_rules! log_instance_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(
            component = $crate::logging::Component::INSTANCE,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_instance_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(
            component = $crate::logging::Component::INSTANCE,
            $($key = $value,)*
            $msg
        )
    };
}

// === RESOLVE logging macros ===

#[macro_export]
macro_rules! log_resolve_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            component = $crate::logging::Component::RESOLVE,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_resolve_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(
            component = $crate::logging::Component::RESOLVE,
            $($key = $value,)*
            $msg
        )
    };
}

// === VIEWS logging macros ===

#[macro_export]
macro_rules! log_views_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(
            component = $crate::logging::Component::VIEWS,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_views_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(
            component = $crate::logging::Component::VIEWS,
            $($key = $value,)*
            $msg
        )
    };
}

// === CONFIG logging macros ===

#[macro_export]
macro_rules! log_config_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(
            component = $crate::logging::Component::CONFIG,
            $($key = $value,)*
            $msg
        )
    };
}

#[macro_export]
macro_rules! log_config_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            component = $crate::logging::Component::CONFIG,
            $($key = $value,)*
            $msg
        )
    };
}

/// Install the file sink and the debug mirror as the global subscriber.
///
/// Returns the log file path, or `None` when no data directory is known.
/// Fails if the file cannot be opened or a global subscriber already exists
/// (the host process may have installed its own).
pub fn init_layer_logging(
    settings: &LayerSettings,
    layer_name: &str,
) -> Result<Option<PathBuf>, LoggingError> {
    let env_filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(LayerSettings::default_log_level().as_filter()));

    let (file_layer, log_path) = match settings.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(layer_name)
                .filename_suffix("log")
                .build(&dir)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(log_file_path(&dir, layer_name)))
        }
        None => (None, None),
    };

    let debug_layer = settings.mirror_to_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(debug_layer)
        .try_init()?;

    Ok(log_path)
}

/// `<dir>/<layer name>.log`
pub fn log_file_path(dir: &std::path::Path, layer_name: &str) -> PathBuf {
    dir.join(format!("{}.log", layer_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_constants() {
        assert_eq!(Component::NEGOTIATE, "NEGOTIATE");
        assert_eq!(Component::CONFIG, "CONFIG");
        assert_eq!(Component::VIEWS, "VIEWS");
    }

    #[test]
    fn test_log_level_filters_parse() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(EnvFilter::try_new(level.as_filter()).is_ok());
        }
    }

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(std::path::Path::new("/tmp/logs"), "XR_APILAYER_test");
        assert_eq!(path, PathBuf::from("/tmp/logs/XR_APILAYER_test.log"));
    }
}
