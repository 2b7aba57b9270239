//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty file (or no file)
//! gives a working engine.
//!
//! ```toml
//! max_commit_retries = 3
//! block_severity = "high"
//! log_profile = "development"
//!
//! [limits]
//! max_text_bytes = 1048576
//! max_patch_ops = 10000
//!
//! [janitor]
//! open_snapshot_ttl_secs = 86400
//! customization_ttl_secs = 604800
//! expunge_customizations = false
//! interval_secs = 3600
//! ```

use std::path::Path;
use std::time::Duration;

use revlex_core::conflict::Severity;
use revlex_core::errors::{ExError, ExErrorKind};
use revlex_core::logging_facility::Profile;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Extra attempts after a `Concurrency` failure
    pub max_commit_retries: u32,
    /// `apply_patch` refuses reports at or above this severity unless forced;
    /// `none` disables gating
    pub block_severity: Severity,
    /// development | production | test
    pub log_profile: String,
    pub limits: LimitsConfig,
    pub janitor: JanitorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
            block_severity: Severity::High,
            log_profile: "development".to_string(),
            limits: LimitsConfig::default(),
            janitor: JanitorConfig::default(),
        }
    }
}

/// Size caps applied before any diff or patch work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_text_bytes: usize,
    pub max_patch_ops: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: 1024 * 1024,
            max_patch_ops: 10_000,
        }
    }
}

/// Housekeeping of abandoned work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JanitorConfig {
    /// Open snapshots untouched for longer are expunged
    pub open_snapshot_ttl_secs: u64,
    /// Customizations with no edits beyond their initial snapshot, untouched
    /// for longer, are deleted when `expunge_customizations` is set
    pub customization_ttl_secs: u64,
    pub expunge_customizations: bool,
    /// Pause between background janitor runs
    pub interval_secs: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            open_snapshot_ttl_secs: 24 * 60 * 60,
            customization_ttl_secs: 7 * 24 * 60 * 60,
            expunge_customizations: false,
            interval_secs: 60 * 60,
        }
    }
}

impl JanitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn invalid(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("load_config")
        .with_message(message)
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `InvalidInput` on malformed TOML, unknown keys or out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_text_bytes == 0 {
            return Err(invalid("limits.max_text_bytes must be positive"));
        }
        if self.limits.max_patch_ops == 0 {
            return Err(invalid("limits.max_patch_ops must be positive"));
        }
        if self.janitor.interval_secs == 0 {
            return Err(invalid("janitor.interval_secs must be positive"));
        }
        self.profile()?;
        Ok(())
    }

    /// Logging profile named by `log_profile`
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an unknown profile name.
    pub fn profile(&self) -> Result<Profile> {
        Profile::parse(&self.log_profile)
            .ok_or_else(|| invalid(format!("unknown log_profile {:?}", self.log_profile)))
    }
}
