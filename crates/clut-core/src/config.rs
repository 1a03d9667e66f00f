//! Engine configuration.
//!
//! ```rust
//! use clut_core::StoreConfig;
//!
//! let cfg = StoreConfig::from_yaml_str("luts_dir: /data/luts\nclut_cache_size: 4\n").unwrap();
//! assert_eq!(cfg.clut_cache_size, 4);
//! assert_eq!(cfg.disk_cache_max_entries, 100);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Settings of a `ClutStore` and the pipelines built from it.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory relative LUT filenames are resolved against.
    pub luts_dir: PathBuf,
    /// Base size of the in-memory caches.
    pub clut_cache_size: usize,
    /// Directory of the persistent external-LUT cache.
    pub disk_cache_dir: PathBuf,
    /// Maximum number of files kept in the disk cache.
    pub disk_cache_max_entries: usize,
    /// Extra module search paths for CTL scripts.
    pub ctl_module_paths: Vec<PathBuf>,
    /// Cap the CTL fast-path LUT resolution in preview quality modes.
    pub ctl_fast_preview: bool,
    /// Kill external LUT commands running longer than this many seconds.
    ///
    /// `None` waits indefinitely.
    pub command_timeout_secs: Option<u64>,
    /// Emit extra diagnostics (unknown parameter names, failed evaluations).
    pub verbose: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            luts_dir: PathBuf::new(),
            clut_cache_size: 10,
            disk_cache_dir: std::env::temp_dir().join("clut-cache"),
            disk_cache_max_entries: 100,
            ctl_module_paths: Vec::new(),
            ctl_fast_preview: true,
            command_timeout_secs: None,
            verbose: false,
        }
    }
}

impl StoreConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded store config");
        Ok(config)
    }

    /// Subprocess timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}
