//! # xrfov-config
//!
//! Per-application field-of-view configuration for the XR FOV modifier layer.
//!
//! Configuration is looked up beside the layer module:
//! 1. `<home>/<application name>.cfg`
//! 2. `<home>/<engine name>.cfg` (only if the application file is missing)
//! 3. Identity transform (all factors 1.0)
//!
//! The file format is one `key=value` pair per line:
//!
//! ```text
//! left.up=0.8
//! right.down=0.9
//! ```
//!
//! Keys are matched verbatim. There are no comments and no whitespace
//! trimming around the key.

pub mod logging;
pub mod settings;
pub mod testing;

pub use settings::LayerSettings;

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Extension of the per-identity configuration files.
pub const CONFIG_EXTENSION: &str = "cfg";

/// Why a configuration line was skipped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineError {
    #[error("no '=' separator")]
    MissingSeparator,
    #[error("unrecognized key \"{0}\"")]
    UnknownKey(String),
    #[error("value \"{value}\" for \"{key}\" is not a number")]
    InvalidValue { key: String, value: String },
}

/// The eight recognized configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    LeftUp,
    LeftDown,
    LeftLeft,
    LeftRight,
    RightUp,
    RightDown,
    RightLeft,
    RightRight,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 8] = [
        ConfigKey::LeftUp,
        ConfigKey::LeftDown,
        ConfigKey::LeftLeft,
        ConfigKey::LeftRight,
        ConfigKey::RightUp,
        ConfigKey::RightDown,
        ConfigKey::RightLeft,
        ConfigKey::RightRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::LeftUp => "left.up",
            ConfigKey::LeftDown => "left.down",
            ConfigKey::LeftLeft => "left.left",
            ConfigKey::LeftRight => "left.right",
            ConfigKey::RightUp => "right.up",
            ConfigKey::RightDown => "right.down",
            ConfigKey::RightLeft => "right.left",
            ConfigKey::RightRight => "right.right",
        }
    }

    /// Exact, case-sensitive lookup. `" left.up"` is not `left.up`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Scale factors for the four frustum edges of one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeScale {
    pub up: f32,
    pub down: f32,
    pub left: f32,
    pub right: f32,
}

impl EyeScale {
    pub const IDENTITY: EyeScale = EyeScale {
        up: 1.0,
        down: 1.0,
        left: 1.0,
        right: 1.0,
    };
}

impl Default for EyeScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Resolved FOV transform for both eyes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovConfig {
    /// Set once a configuration file was opened, even if no line matched
    pub loaded: bool,
    pub left: EyeScale,
    pub right: EyeScale,
}

impl Default for FovConfig {
    fn default() -> Self {
        Self {
            loaded: false,
            left: EyeScale::IDENTITY,
            right: EyeScale::IDENTITY,
        }
    }
}

impl FovConfig {
    /// Reset to defaults, then load by application name, falling back to
    /// the engine name.
    pub fn resolve(home: &Path, application_name: &str, engine_name: &str) -> Self {
        let mut config = Self::default();
        if !config.load(home, application_name) {
            config.load(home, engine_name);
        }
        config.dump();
        config
    }

    /// Load `<home>/<identity>.cfg` on top of the current values.
    ///
    /// Returns `false` without touching the filesystem when `identity` is
    /// empty, and `false` when the file cannot be opened. Once the file is
    /// open the config is marked loaded, whatever its lines contain.
    pub fn load(&mut self, home: &Path, identity: &str) -> bool {
        if identity.is_empty() {
            return false;
        }

        let path = config_path(home, identity);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                crate::log_config_info!(
                    "Could not load config",
                    identity = identity,
                    path = tracing::field::display(path.display()),
                    error = tracing::field::display(&err),
                );
                return false;
            }
        };

        crate::log_config_info!(
            "Loading config",
            identity = identity,
            path = tracing::field::display(path.display()),
        );
        self.apply(BufReader::new(file));
        self.loaded = true;
        true
    }

    /// Apply every well-formed line from `reader`. Malformed lines are
    /// skipped and logged with their 1-based line number. Returns the number
    /// of lines applied.
    pub fn apply<R: BufRead>(&mut self, reader: R) -> usize {
        let mut applied = 0;
        for (index, line) in reader.split(b'\n').enumerate() {
            let line_number = index + 1;
            let raw = match line {
                Ok(raw) => raw,
                Err(err) => {
                    crate::log_config_warn!(
                        "Config read stopped",
                        line = line_number,
                        error = tracing::field::display(&err),
                    );
                    break;
                }
            };
            let line = decode_line(&raw);
            match parse_line(&line) {
                Ok((key, value)) => {
                    self.set(key, value);
                    applied += 1;
                }
                Err(err) => {
                    crate::log_config_warn!(
                        "Error parsing config line",
                        line = line_number,
                        reason = tracing::field::display(&err),
                    );
                }
            }
        }
        applied
    }

    pub fn set(&mut self, key: ConfigKey, value: f32) {
        match key {
            ConfigKey::LeftUp => self.left.up = value,
            ConfigKey::LeftDown => self.left.down = value,
            ConfigKey::LeftLeft => self.left.left = value,
            ConfigKey::LeftRight => self.left.right = value,
            ConfigKey::RightUp => self.right.up = value,
            ConfigKey::RightDown => self.right.down = value,
            ConfigKey::RightLeft => self.right.left = value,
            ConfigKey::RightRight => self.right.right = value,
        }
    }

    pub fn get(&self, key: ConfigKey) -> f32 {
        match key {
            ConfigKey::LeftUp => self.left.up,
            ConfigKey::LeftDown => self.left.down,
            ConfigKey::LeftLeft => self.left.left,
            ConfigKey::LeftRight => self.left.right,
            ConfigKey::RightUp => self.right.up,
            ConfigKey::RightDown => self.right.down,
            ConfigKey::RightLeft => self.right.left,
            ConfigKey::RightRight => self.right.right,
        }
    }

    /// Log the factors in use. Silent when nothing was loaded.
    pub fn dump(&self) {
        if !self.loaded {
            return;
        }
        crate::log_config_info!(
            "Using FOV factors",
            left_up = self.left.up,
            left_down = self.left.down,
            left_left = self.left.left,
            left_right = self.left.right,
            right_up = self.right.up,
            right_down = self.right.down,
            right_left = self.right.left,
            right_right = self.right.right,
        );
    }
}

/// `<home>/<identity>.cfg`
pub fn config_path(home: &Path, identity: &str) -> PathBuf {
    home.join(format!("{}.{}", identity, CONFIG_EXTENSION))
}

/// Split one line at the first `=` and parse both halves.
pub fn parse_line(line: &str) -> Result<(ConfigKey, f32), LineError> {
    let (name, value) = line.split_once('=').ok_or(LineError::MissingSeparator)?;
    let key = ConfigKey::from_name(name).ok_or_else(|| LineError::UnknownKey(name.to_string()))?;
    let value = parse_float_prefix(value).ok_or_else(|| LineError::InvalidValue {
        key: name.to_string(),
        value: value.to_string(),
    })?;
    Ok((key, value))
}

/// Parse the longest leading number of `raw` the way `strtof` does, after
/// leading whitespace, ignoring whatever follows it (`"0.8 # wide"` is 0.8).
/// Accepts decimal and `0x` hexadecimal forms. Results that overflow or
/// underflow `f32` are rejected.
pub fn parse_float_prefix(raw: &str) -> Option<f32> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let (negative, unsigned) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let hex = unsigned
        .strip_prefix(b"0x")
        .or_else(|| unsigned.strip_prefix(b"0X"));
    // "0x" without hex digits reads as the leading "0".
    if let Some((magnitude, nonzero)) = hex.and_then(parse_hex_magnitude) {
        let magnitude = magnitude as f32;
        return representable(if negative { -magnitude } else { magnitude }, nonzero);
    }

    let digits_from = |mut at: usize| {
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        at
    };

    let start = bytes.len() - unsigned.len();
    let int_end = digits_from(start);
    let mut mantissa_digits = int_end - start;
    let mut end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }
    let nonzero = bytes[start..end].iter().any(|b| matches!(b, b'1'..=b'9'));

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    representable(s[..end].parse::<f32>().ok()?, nonzero)
}

/// Magnitude of `<hex>[.<hex>][p[+-]<digits>]` and whether any mantissa
/// digit is non-zero. `None` when no hex digit is present.
fn parse_hex_magnitude(bytes: &[u8]) -> Option<(f64, bool)> {
    let mut at = 0;
    let mut mantissa: u64 = 0;
    let mut exponent: i64 = 0;
    let mut digits = 0;
    let mut nonzero = false;
    let mut seen_point = false;

    while let Some(&b) = bytes.get(at) {
        if b == b'.' && !seen_point {
            seen_point = true;
            at += 1;
            continue;
        }
        let Some(digit) = char::from(b).to_digit(16) else {
            break;
        };
        digits += 1;
        nonzero |= digit != 0;
        if mantissa >> 60 == 0 {
            mantissa = mantissa << 4 | u64::from(digit);
            if seen_point {
                exponent -= 4;
            }
        } else if !seen_point {
            // Mantissa is full; further integer digits only scale it.
            exponent += 4;
        }
        at += 1;
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(at), Some(b'p') | Some(b'P')) {
        let mut exp_at = at + 1;
        let negative = match bytes.get(exp_at) {
            Some(b'-') => {
                exp_at += 1;
                true
            }
            Some(b'+') => {
                exp_at += 1;
                false
            }
            _ => false,
        };
        let exp_start = exp_at;
        let mut value: i64 = 0;
        while let Some(&d) = bytes.get(exp_at).filter(|b| b.is_ascii_digit()) {
            value = (value * 10 + i64::from(d - b'0')).min(100_000);
            exp_at += 1;
        }
        if exp_at > exp_start {
            exponent += if negative { -value } else { value };
        }
    }

    let scale = exponent.clamp(-4_000, 4_000) as i32;
    Some((mantissa as f64 * 2f64.powi(scale), nonzero))
}

/// `strtof` reports `ERANGE` for infinities and for non-zero input that
/// lands at or below the subnormal range.
fn representable(value: f32, nonzero_digits: bool) -> Option<f32> {
    if !value.is_finite() || value.is_subnormal() || (value == 0.0 && nonzero_digits) {
        return None;
    }
    Some(value)
}

fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_default_is_identity() {
        let config = FovConfig::default();
        assert!(!config.loaded);
        for key in ConfigKey::ALL {
            assert_eq!(config.get(key), 1.0);
        }
    }

    #[test]
    fn test_key_names_roundtrip() {
        for key in ConfigKey::ALL {
            assert_eq!(ConfigKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(ConfigKey::from_name("Left.Up"), None);
        assert_eq!(ConfigKey::from_name("left.up "), None);
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("left.up=0.8"), Ok((ConfigKey::LeftUp, 0.8)));
        assert_eq!(parse_line("right.right=-1.5e1"), Ok((ConfigKey::RightRight, -15.0)));
        assert_eq!(parse_line("nonsense_no_equals"), Err(LineError::MissingSeparator));
        assert_eq!(parse_line(""), Err(LineError::MissingSeparator));
        assert_eq!(
            parse_line("left.top=0.5"),
            Err(LineError::UnknownKey("left.top".to_string()))
        );
        assert_eq!(
            parse_line("left.up=notanumber"),
            Err(LineError::InvalidValue {
                key: "left.up".to_string(),
                value: "notanumber".to_string(),
            })
        );
    }

    #[test]
    fn test_indented_key_does_not_match() {
        assert_eq!(
            parse_line("  left.up = 0.9"),
            Err(LineError::UnknownKey("  left.up ".to_string()))
        );
    }

    #[test]
    fn test_value_splits_at_first_equals() {
        assert_eq!(
            parse_line("left.up==0.5"),
            Err(LineError::InvalidValue {
                key: "left.up".to_string(),
                value: "=0.5".to_string(),
            })
        );
    }

    #[test]
    fn test_float_prefix() {
        assert_eq!(parse_float_prefix("0.75"), Some(0.75));
        assert_eq!(parse_float_prefix("  0.75"), Some(0.75));
        assert_eq!(parse_float_prefix("0.75 trailing"), Some(0.75));
        assert_eq!(parse_float_prefix("1."), Some(1.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("+2"), Some(2.0));
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("2e-1x"), Some(0.2));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix(""), None);
        assert_eq!(parse_float_prefix("abc"), None);
        assert_eq!(parse_float_prefix("1e99"), None);
        assert_eq!(parse_float_prefix("0"), Some(0.0));
        assert_eq!(parse_float_prefix("0.000e-90"), Some(0.0));
    }

    #[test]
    fn test_float_prefix_rejects_underflow() {
        assert_eq!(parse_float_prefix("1e-50"), None);
        assert_eq!(parse_float_prefix("-1e-50"), None);
        assert_eq!(parse_float_prefix("1e-40"), None);
        assert_eq!(parse_float_prefix("1e-30"), Some(1e-30));
    }

    #[test]
    fn test_float_prefix_hexadecimal() {
        assert_eq!(parse_float_prefix("0x1p-1"), Some(0.5));
        assert_eq!(parse_float_prefix("0X1P-1"), Some(0.5));
        assert_eq!(parse_float_prefix("-0x1.8"), Some(-1.5));
        assert_eq!(parse_float_prefix("0xAp0 tail"), Some(10.0));
        assert_eq!(parse_float_prefix("0x.8"), Some(0.5));
        assert_eq!(parse_float_prefix("0x1p"), Some(1.0));
        assert_eq!(parse_float_prefix("0x"), Some(0.0));
        assert_eq!(parse_float_prefix("0xg"), Some(0.0));
        assert_eq!(parse_float_prefix("0x1p-200"), None);
        assert_eq!(parse_float_prefix("0x1p200"), None);
    }

    #[test]
    fn test_apply_last_write_wins() {
        let mut config = FovConfig::default();
        let applied = config.apply(Cursor::new("right.down=0.5\nright.down=0.9\n"));
        assert_eq!(applied, 2);
        assert_eq!(config.right.down, 0.9);
    }

    #[test]
    fn test_apply_skips_malformed_lines() {
        let mut config = FovConfig::default();
        let applied = config.apply(Cursor::new(
            "nonsense_no_equals\nleft.up=notanumber\nleft.down=0.7\n\nright.up=0.6\n\
             right.left=1e-50\nright.right=0x1p-1\n",
        ));
        assert_eq!(applied, 3);
        assert_eq!(config.left.up, 1.0);
        assert_eq!(config.left.down, 0.7);
        assert_eq!(config.right.up, 0.6);
        assert_eq!(config.right.left, 1.0);
        assert_eq!(config.right.right, 0.5);
    }

    /// Yields its content once, then fails every read.
    struct BrokenReader {
        content: Cursor<Vec<u8>>,
    }

    impl std::io::Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match std::io::Read::read(&mut self.content, buf)? {
                0 => Err(std::io::Error::other("device lost")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_apply_stops_at_read_error() {
        let reader = std::io::BufReader::new(BrokenReader {
            content: Cursor::new(b"left.up=0.8\nright.up=0.6".to_vec()),
        });
        let mut config = FovConfig::default();
        let applied = config.apply(reader);
        assert_eq!(applied, 1);
        assert_eq!(config.left.up, 0.8);
        assert_eq!(config.right.up, 1.0);
    }

    #[test]
    fn test_apply_handles_crlf_and_invalid_utf8() {
        let mut config = FovConfig::default();
        let content = b"left.left=0.5\r\n\xff\xfe=1\r\nleft.right=0.25\r\n";
        let applied = config.apply(Cursor::new(content.to_vec()));
        assert_eq!(applied, 2);
        assert_eq!(config.left.left, 0.5);
        assert_eq!(config.left.right, 0.25);
    }

    /// Collects formatted log output for inspection.
    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_every_skipped_line_is_logged_at_warn() {
        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let mut config = FovConfig::default();
            config.apply(Cursor::new("left.up=0.8\nnonsense_no_equals\nbogus=1\n"));
        });

        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{}", text);
        assert!(lines[0].contains("WARN") && lines[0].contains("line=2"));
        assert!(lines[0].contains("no '=' separator"));
        assert!(lines[1].contains("WARN") && lines[1].contains("line=3"));
    }

    #[test]
    fn test_apply_does_not_mark_loaded() {
        let mut config = FovConfig::default();
        config.apply(Cursor::new("left.up=0.8"));
        assert!(!config.loaded);
    }
}
