use thiserror::Error;

/// Invalid engine or pipeline configuration. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a positive, finite number, got {value}")]
    NotPositive { key: &'static str, value: f64 },

    #[error("beamWidth must retain at least one state")]
    ZeroBeamWidth,

    #[error("routeBoundFactor must be at least 1, got {0}")]
    RouteBoundFactor(f64),

    #[error("chunk size must be at least one record")]
    ZeroChunkSize,

    #[error("flush size must be at least one record")]
    ZeroFlushRecords,

    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode configuration: {0}")]
    Decode(#[from] serde_json::Error),
}
