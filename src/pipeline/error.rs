use crate::pipeline::DeliveryId;
use crate::transition::MatchError;
use crate::util::retry::Exhausted;

use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode observations: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("matching failed: {0}")]
    Match(#[from] MatchError),

    #[error("delivery {0} is not in flight")]
    UnknownDelivery(DeliveryId),

    #[error("{failed} of {parts} part(s) of trace {trace} could not be written")]
    Write {
        trace: String,
        failed: usize,
        parts: usize,
    },

    #[error("gave up on {target} after {attempts} attempt(s): {reason}")]
    Exhausted {
        target: String,
        attempts: usize,
        reason: String,
    },
}

impl<E: Display> From<Exhausted<E>> for PipelineError {
    fn from(value: Exhausted<E>) -> Self {
        PipelineError::Exhausted {
            target: value.target,
            attempts: value.attempts,
            reason: value.last.to_string(),
        }
    }
}
