//! Probe scenarios: one-off post, bulk population, and timed read passes.
//!
//! Every request is awaited before the next one is sent. HTTP statuses are
//! recorded as data; only transport failures end a scenario early.

use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::generate::MovieGenerator;
use crate::movie::{MoviePayload, PayloadVariant};

pub const COLD_LABEL: &str = "cold cache";
pub const WARM_LABEL: &str = "warm cache";

const RULE: &str = "---------------------";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedMovie {
    pub index: i32,
    pub key: String,
    pub status: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PopulateOutcome {
    pub variant: PayloadVariant,
    pub created: Vec<CreatedMovie>,
}

impl PopulateOutcome {
    pub fn succeeded(&self) -> usize {
        self.created
            .iter()
            .filter(|movie| (200..300).contains(&movie.status))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.created.len() - self.succeeded()
    }

    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.created.iter().map(|movie| movie.status)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LatencyReport {
    pub label: String,
    pub requests: usize,
    pub total_micros: u64,
    pub mean_micros: Option<f64>,
    pub non_success: usize,
}

impl LatencyReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            requests: 0,
            total_micros: 0,
            mean_micros: None,
            non_success: 0,
        }
    }

    pub fn record(&mut self, status: u16, elapsed_micros: u64) {
        self.requests += 1;
        self.total_micros = self.total_micros.saturating_add(elapsed_micros);
        if !(200..300).contains(&status) {
            self.non_success += 1;
        }
        self.mean_micros = Some(self.total_micros as f64 / self.requests as f64);
    }

    pub fn mean_micros(&self) -> Option<f64> {
        self.mean_micros
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        match self.mean_micros {
            Some(mean) => writeln!(f, "Avg Response Time ({}): {mean} µs", self.label)?,
            None => writeln!(f, "Avg Response Time ({}): n/a", self.label)?,
        }
        write!(f, "{RULE}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheComparison {
    pub cold: LatencyReport,
    pub warm: LatencyReport,
}

impl CacheComparison {
    /// Cold mean over warm mean; `None` unless both passes measured something.
    pub fn speedup(&self) -> Option<f64> {
        match (self.cold.mean_micros, self.warm.mean_micros) {
            (Some(cold), Some(warm)) if warm > 0.0 => Some(cold / warm),
            _ => None,
        }
    }
}

impl fmt::Display for CacheComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.cold)?;
        write!(f, "{}", self.warm)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunOutcome {
    pub populate: Option<PopulateOutcome>,
    pub comparison: CacheComparison,
}

/// Single-line JSON rendering of a status, outcome, or report.
pub fn render_json<T: Serialize>(value: &T) -> ProbeResult<String> {
    sonic_rs::to_string(value).map_err(|err| ProbeError::Encode(err.to_string()))
}

/// Posts the fixed "Test Movie A" payload and returns the status code.
pub async fn post_sample(catalog: &CatalogClient, variant: PayloadVariant) -> ProbeResult<u16> {
    let payload = MoviePayload::sample(variant);
    let response = catalog.create(&payload).await?;
    if !response.is_success() {
        warn!(status = response.status, key = %payload.key(), "sample post rejected");
    }
    Ok(response.status)
}

/// Generates and posts one movie per index. A duplicate population is expected
/// to come back as 500s; those are recorded like any other status.
pub async fn populate(
    catalog: &CatalogClient,
    generator: &mut MovieGenerator,
    variant: PayloadVariant,
    range: Range<i32>,
) -> ProbeResult<PopulateOutcome> {
    info!(start = range.start, end = range.end, %variant, "populating catalog");
    let mut outcome = PopulateOutcome {
        variant,
        created: Vec::with_capacity(range.len()),
    };
    for index in range {
        let payload = generator.movie(index, variant);
        let response = catalog.create(&payload).await?;
        if !response.is_success() {
            warn!(index, status = response.status, "create rejected");
        }
        outcome.created.push(CreatedMovie {
            index,
            key: payload.key(),
            status: response.status,
        });
    }
    info!(
        succeeded = outcome.succeeded(),
        failed = outcome.failed(),
        "population finished"
    );
    Ok(outcome)
}

/// Fetches every key in order and averages the elapsed time of the calls.
pub async fn timed_reads(
    catalog: &CatalogClient,
    keys: &[String],
    label: &str,
) -> ProbeResult<LatencyReport> {
    let mut report = LatencyReport::new(label);
    for key in keys {
        let response = catalog.fetch(key).await?;
        let micros = u64::try_from(response.elapsed_micros()).unwrap_or(u64::MAX);
        report.record(response.status, micros);
    }
    info!(
        label,
        requests = report.requests,
        mean_us = report.mean_micros.unwrap_or_default(),
        "read pass finished"
    );
    Ok(report)
}

/// Two read passes over the same keys: the first expected cold, the second warm.
pub async fn cold_warm(catalog: &CatalogClient, keys: &[String]) -> ProbeResult<CacheComparison> {
    let cold = timed_reads(catalog, keys, COLD_LABEL).await?;
    let warm = timed_reads(catalog, keys, WARM_LABEL).await?;
    Ok(CacheComparison { cold, warm })
}

/// Keys for a fetch range. Numeric ids come straight from the range; slugs
/// only exist for movies generated earlier in the same run.
pub fn fetch_keys(
    variant: PayloadVariant,
    range: Range<i32>,
    populated: Option<&PopulateOutcome>,
) -> ProbeResult<Vec<String>> {
    match variant {
        PayloadVariant::A => Ok(range.map(|index| index.to_string()).collect()),
        PayloadVariant::B => {
            let populated = populated.ok_or(ProbeError::MissingKeys { variant })?;
            Ok(populated
                .created
                .iter()
                .filter(|movie| range.contains(&movie.index))
                .map(|movie| movie.key.clone())
                .collect())
        }
    }
}

/// Population followed by the cold and warm read passes.
pub async fn run(
    catalog: &CatalogClient,
    config: &ProbeConfig,
    with_populate: bool,
) -> ProbeResult<RunOutcome> {
    let populate_outcome = if with_populate {
        let mut generator = MovieGenerator::new(config.seed)
            .with_year_range(config.years())
            .with_word_counts(config.title_words, config.description_words);
        Some(populate(catalog, &mut generator, config.variant, config.populate_range()).await?)
    } else {
        None
    };

    let keys = fetch_keys(
        config.variant,
        config.fetch_range(),
        populate_outcome.as_ref(),
    )?;
    let comparison = cold_warm(catalog, &keys).await?;
    if let Some(speedup) = comparison.speedup() {
        info!(speedup, "warm/cold comparison");
    }

    Ok(RunOutcome {
        populate: populate_outcome,
        comparison,
    })
}
