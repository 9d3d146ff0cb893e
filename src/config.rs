//! Mirror configuration.
//!
//! Settings are collected once at startup, from an optional TOML file and the
//! command line, into a [`MirrorConfig`] that is passed by reference to every
//! pass.

use crate::digest::HashAlgorithm;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default delay between two passes (one hour)
pub const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;

/// What a pass does when a single entry fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the pass at the first failing entry; the next pass starts over
    #[default]
    Abort,
    /// Record the failure and carry on with the next entry
    Continue,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub interval: Duration,
    pub hash: HashAlgorithm,
    pub on_error: ErrorPolicy,
}

impl MirrorConfig {
    /// Configuration with default interval, hash and error policy
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            hash: HashAlgorithm::default(),
            on_error: ErrorPolicy::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }
}

/// Settings as they appear in a config file or on the command line.
///
/// Every field is optional so layers can be merged before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub hash: Option<HashAlgorithm>,
    pub on_error: Option<ErrorPolicy>,
}

impl PartialConfig {
    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: PartialConfig) -> Self {
        Self {
            source: overrides.source.or(self.source),
            target: overrides.target.or(self.target),
            interval_secs: overrides.interval_secs.or(self.interval_secs),
            hash: overrides.hash.or(self.hash),
            on_error: overrides.on_error.or(self.on_error),
        }
    }

    /// Validate and fill defaults
    pub fn resolve(self) -> Result<MirrorConfig> {
        let source = self.source.ok_or_else(|| Error::Configuration {
            reason: "source directory is required".to_string(),
        })?;
        let target = self.target.ok_or_else(|| Error::Configuration {
            reason: "target directory is required".to_string(),
        })?;

        let interval_secs = self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(Error::Configuration {
                reason: "interval must be at least one second".to_string(),
            });
        }

        Ok(MirrorConfig::new(&source, &target)
            .with_interval(Duration::from_secs(interval_secs))
            .with_hash(self.hash.unwrap_or_default())
            .with_error_policy(self.on_error.unwrap_or_default()))
    }
}
