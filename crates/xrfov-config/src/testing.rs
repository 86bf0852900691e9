//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated config home holding `<identity>.cfg` files
//! - An isolated log directory
//!
//! # Usage
//!
//! ```ignore
//! use xrfov_config::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     env.write_config("MyGame", "left.up=0.8\n").unwrap();
//!     // env.home is ready to be passed to FovConfig::load
//! }
//! ```

use std::path::PathBuf;
use tempfile::TempDir;

use crate::settings::LayerSettings;

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Config home (stands in for the module directory)
    pub home: PathBuf,
    /// Log directory
    pub log_dir: PathBuf,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let home = root.join("home");
        let log_dir = root.join("logs");
        std::fs::create_dir_all(&home)?;
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            home,
            log_dir,
        })
    }

    /// Write `<home>/<identity>.cfg` with `content`
    pub fn write_config(&self, identity: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = crate::config_path(&self.home, identity);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Settings pointing the layer at this environment's directories.
    pub fn settings(&self) -> LayerSettings {
        LayerSettings {
            home: Some(self.home.clone()),
            log_dir: Some(self.log_dir.clone()),
            ..LayerSettings::default()
        }
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
