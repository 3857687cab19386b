// src/config/validate.rs

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, MAX_CONCURRENCY};
use crate::errors::{DayplanError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DayplanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_section(&raw.config)?;
        Ok(ConfigFile::new_unchecked(raw.config))
    }
}

/// Check the `[config]` section invariants.
pub fn validate_section(cfg: &ConfigSection) -> Result<()> {
    if cfg.concurrency == 0 {
        return Err(DayplanError::Config(
            "[config].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.concurrency > MAX_CONCURRENCY {
        return Err(DayplanError::Config(format!(
            "[config].concurrency must be <= {MAX_CONCURRENCY} (got {})",
            cfg.concurrency
        )));
    }

    if cfg.plan.as_os_str().is_empty() {
        return Err(DayplanError::Config(
            "[config].plan must not be empty".to_string(),
        ));
    }

    Ok(())
}
