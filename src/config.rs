//! Stitcher configuration
//!
//! Settings come from defaults, optionally overridden by a TOML file:
//!
//! ```toml
//! [stitch]
//! group_files = true
//! split_series = true
//! max_open_files = 64
//! unresolved_axis = "series"   # or "reject"
//! ```

use std::fs;

use log::{debug, warn};

use crate::stitch::axis::UnresolvedAxisPolicy;
use crate::stitch::errors::{StitchError, StitchResult};

/// Default cap on readers open at once per file family
pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchConfig {
    /// Group sibling files into one dataset; when off, only the seed file is read
    pub group_files: bool,
    /// Give each value of a series-prefixed block its own series
    pub split_series: bool,
    /// Readers kept open per file family, 0 for no limit
    pub max_open_files: usize,
    pub unresolved_axis: UnresolvedAxisPolicy,
}

impl Default for StitchConfig {
    fn default() -> Self {
        StitchConfig {
            group_files: true,
            split_series: true,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            unresolved_axis: UnresolvedAxisPolicy::default(),
        }
    }
}

impl StitchConfig {
    /// Parses a configuration from TOML text
    ///
    /// Keys live under `[stitch]`; missing keys keep their defaults and
    /// unknown keys are ignored with a warning.
    pub fn from_toml_str(content: &str) -> StitchResult<Self> {
        let toml_value: toml::Value = content
            .parse()
            .map_err(|e| StitchError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut config = StitchConfig::default();
        let Some(table) = toml_value.get("stitch").and_then(|v| v.as_table()) else {
            return Ok(config);
        };

        for (key, value) in table {
            let wrong_type = |expected: &str| StitchError::Config(format!("'{}' must be {}", key, expected));
            match key.as_str() {
                "group_files" => config.group_files = value.as_bool().ok_or_else(|| wrong_type("a boolean"))?,
                "split_series" => config.split_series = value.as_bool().ok_or_else(|| wrong_type("a boolean"))?,
                "max_open_files" => {
                    let limit = value.as_integer().ok_or_else(|| wrong_type("an integer"))?;
                    config.max_open_files = usize::try_from(limit).map_err(|_| wrong_type("non-negative"))?;
                }
                "unresolved_axis" => {
                    let name = value.as_str().ok_or_else(|| wrong_type("a string"))?;
                    config.unresolved_axis = UnresolvedAxisPolicy::from_name(name)
                        .ok_or_else(|| wrong_type("\"series\" or \"reject\""))?;
                }
                other => warn!("Ignoring unknown configuration key '{}'", other),
            }
        }
        Ok(config)
    }

    /// Loads a configuration file
    pub fn from_file(path: &str) -> StitchResult<Self> {
        debug!("Loading configuration from {}", path);
        let content = fs::read_to_string(path)
            .map_err(|e| StitchError::Config(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }
}
