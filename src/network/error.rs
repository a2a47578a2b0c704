use crate::network::SegmentId;
use thiserror::Error;

/// Malformed road-network input. Always fatal.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("segment {id} has {count} coordinate(s), at least two are required")]
    TooFewCoordinates { id: SegmentId, count: usize },

    #[error("segment id {id} appears more than once")]
    DuplicateId { id: SegmentId },

    #[error("segment {id} has an invalid coordinate at position {position}")]
    InvalidCoordinate { id: SegmentId, position: usize },

    #[error("segment {id} has zero length")]
    ZeroLength { id: SegmentId },

    #[error("could not read network: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode network: {0}")]
    Decode(#[from] serde_json::Error),
}
