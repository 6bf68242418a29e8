//! Discovery configuration file
//!
//! Discovery settings can be kept in a TOML file:
//!
//! ```toml
//! iterations = 6
//! wait_ms = 20
//! strict = true
//! expected = ["C4000000000001FA", "C400000000000218"]
//! ```
//!
//! `expected` may also be a plain count (`expected = 2`). Every key is
//! optional; missing keys take the defaults of [`DiscoveryConfig`].

use std::fs;
use std::path::Path;

use crate::discovery::Expected;
use crate::error::{Error, Result};
use crate::protocol::{DEFAULT_SCAN_ITERATIONS, DEFAULT_SCAN_WAIT_MS};

/// Settings for repeated discovery
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Maximum number of search passes
    pub iterations: usize,
    /// Pause between passes in milliseconds
    pub wait_ms: u32,
    /// Fail instead of warning when peripherals are missing
    pub strict: bool,
    /// What should be found, if known
    pub expected: Option<Expected>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SCAN_ITERATIONS,
            wait_ms: DEFAULT_SCAN_WAIT_MS,
            strict: false,
            expected: None,
        }
    }
}

impl DiscoveryConfig {
    /// Load settings from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}
