use std::ops::{Range, RangeInclusive};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::generate::{DEFAULT_DESCRIPTION_WORDS, DEFAULT_TITLE_WORDS, DEFAULT_YEARS};
use crate::movie::PayloadVariant;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/movies";
pub const ENV_URL: &str = "MOVIES_PROBE_URL";
pub const ENV_SEED: &str = "MOVIES_PROBE_SEED";

/// Command-line values that override every other layer. `None` leaves the
/// lower layers in charge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub variant: Option<PayloadVariant>,
    pub seed: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub populate_start: Option<i32>,
    pub populate_end: Option<i32>,
    pub fetch_start: Option<i32>,
    pub fetch_end: Option<i32>,
}

/// Probe settings. Precedence, lowest first: defaults, TOML file,
/// environment, command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub base_url: String,
    pub variant: PayloadVariant,
    pub populate_start: i32,
    pub populate_end: i32,
    pub fetch_start: i32,
    pub fetch_end: i32,
    pub year_min: i32,
    pub year_max: i32,
    pub title_words: usize,
    pub description_words: usize,
    pub seed: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            variant: PayloadVariant::A,
            populate_start: 123,
            populate_end: 202,
            fetch_start: 123,
            fetch_end: 201,
            year_min: *DEFAULT_YEARS.start(),
            year_max: *DEFAULT_YEARS.end(),
            title_words: DEFAULT_TITLE_WORDS,
            description_words: DEFAULT_DESCRIPTION_WORDS,
            seed: None,
            timeout_ms: None,
        }
    }
}

impl ProbeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Applies `MOVIES_PROBE_URL` and `MOVIES_PROBE_SEED` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            self.base_url = url;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{ENV_SEED} is not a u64: {seed}")))?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    /// Layers `file` over the defaults, then the environment seen through
    /// `lookup`, then `overrides`, and validates the result.
    pub fn resolve<F>(
        file: Option<&Path>,
        lookup: F,
        overrides: &CliOverrides,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.base_url {
            self.base_url = url.clone();
        }
        if let Some(variant) = overrides.variant {
            self.variant = variant;
        }
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = Some(timeout_ms);
        }
        self.populate_start = overrides.populate_start.unwrap_or(self.populate_start);
        self.populate_end = overrides.populate_end.unwrap_or(self.populate_end);
        self.fetch_start = overrides.fetch_start.unwrap_or(self.fetch_start);
        self.fetch_end = overrides.fetch_end.unwrap_or(self.fetch_end);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://: {url}"
            )));
        }
        if self.populate_start > self.populate_end {
            return Err(ConfigError::Invalid(format!(
                "populate range is reversed: {}..{}",
                self.populate_start, self.populate_end
            )));
        }
        if self.fetch_start > self.fetch_end {
            return Err(ConfigError::Invalid(format!(
                "fetch range is reversed: {}..{}",
                self.fetch_start, self.fetch_end
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "timeout_ms must be positive; omit it for no timeout".to_string(),
            ));
        }
        if self.year_min > self.year_max {
            return Err(ConfigError::Invalid(format!(
                "year range is reversed: {}..={}",
                self.year_min, self.year_max
            )));
        }
        Ok(())
    }

    pub fn populate_range(&self) -> Range<i32> {
        self.populate_start..self.populate_end
    }

    pub fn fetch_range(&self) -> Range<i32> {
        self.fetch_start..self.fetch_end
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.year_min..=self.year_max
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
