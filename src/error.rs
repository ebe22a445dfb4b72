use std::path::PathBuf;

use crate::adapter::TransportError;
use crate::movie::PayloadVariant;

pub type ProbeResult<T> = Result<T, ProbeError>;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A read came back with a status that carries no movie.
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode movie: {0}")]
    Decode(String),

    #[error("could not encode output: {0}")]
    Encode(String),

    /// Variant B movies are addressed by slug, and slugs only exist once a
    /// population pass has generated them.
    #[error("no keys to fetch for variant {variant}: populate in the same run first")]
    MissingKeys { variant: PayloadVariant },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
