use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("observation {index} at ({lat}, {lon}) is not a valid coordinate")]
    InvalidObservation { index: usize, lat: f64, lon: f64 },

    #[error("trellis is corrupt: {0}")]
    InternalInvariant(InvariantError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("state {state} of observation {observation} has no predecessor")]
    MissingParent { observation: usize, state: usize },

    #[error("state {state} of observation {observation} points to a predecessor which does not exist")]
    DanglingParent { observation: usize, state: usize },

    #[error("the layer of observation {observation} has no states")]
    EmptyLayer { observation: usize },
}

impl From<InvariantError> for MatchError {
    fn from(value: InvariantError) -> Self {
        MatchError::InternalInvariant(value)
    }
}
