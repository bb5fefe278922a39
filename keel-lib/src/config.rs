// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Config
//!
//! Defaults, then an optional TOML file, then the `KEEL_LOG` environment variable.
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [workbench]
//! pushes = 20
//! align = 16
//! ```

use std::{path::Path, str::FromStr};

use log::LevelFilter;

pub const LOG_ENV: &str = "KEEL_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub log_level: LevelFilter,
    /// Pushes performed by `workbench growth`.
    pub pushes: usize,
    /// Block size in bytes used by `workbench read`.
    pub align: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LevelFilter::Info,
            pushes: 8,
            align: 4,
        }
    }
}

impl Config {
    /// Layers every source over the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(path) = file {
            let text = std::fs::read_to_string(path)?;
            config.apply_toml(&text)?;
        }
        config.apply_env(std::env::var(LOG_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Overrides the fields present in `text`.  Unknown keys are ignored.
    pub fn apply_toml(&mut self, text: &str) -> Result<(), ConfigError> {
        let parsed: toml::Table = toml::from_str(text)?;

        if let Some(level) = parsed.get("log").and_then(|l| l.get("level")) {
            let level = level
                .as_str()
                .ok_or_else(|| ConfigError::Invalid(format!("log.level must be a string: {level}")))?;
            self.log_level = parse_level(level)?;
        }

        if let Some(workbench) = parsed.get("workbench") {
            if let Some(pushes) = workbench.get("pushes") {
                self.pushes = count("workbench.pushes", pushes)?;
            }
            if let Some(align) = workbench.get("align") {
                let align = count("workbench.align", align)?;
                if align == 0 {
                    return Err(ConfigError::Invalid("workbench.align must be positive".into()));
                }
                self.align = align;
            }
        }
        Ok(())
    }

    /// Applies a `KEEL_LOG` value.  `None` and empty strings leave the level alone.
    pub fn apply_env(&mut self, log: Option<&str>) -> Result<(), ConfigError> {
        match log.map(str::trim) {
            Some(level) if !level.is_empty() => {
                self.log_level = parse_level(level)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level)
        .map_err(|_| ConfigError::Invalid(format!("unknown log level {level:?}")))
}

fn count(key: &str, value: &toml::Value) -> Result<usize, ConfigError> {
    value
        .as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ConfigError::Invalid(format!("{key} must be a non-negative integer: {value}")))
}
