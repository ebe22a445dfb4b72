//! Client-side probe for a movie-catalog HTTP service: posts movie payloads,
//! prints status codes, and compares cold and warm read latency.

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generate;
pub mod mock;
pub mod movie;
pub mod probe;

pub use reqwest::Method;

pub use adapter::{
    Client, ProbeBytes, ProbeRequest, ProbeResponse, ReqwestTransport, Transport, TransportError,
    TransportErrorKind, TransportFuture, TransportResult,
};
pub use catalog::CatalogClient;
pub use config::ProbeConfig;
pub use error::{ConfigError, ProbeError, ProbeResult};
pub use generate::MovieGenerator;
pub use mock::{MockBehavior, MockBehaviorPlan, MockCatalog, MockCatalogSnapshot};
pub use movie::{Movie, MoviePayload, PayloadVariant, SluggedMovie};
pub use probe::{CacheComparison, LatencyReport, PopulateOutcome, RunOutcome};
