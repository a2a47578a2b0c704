use crate::matcher::MatchedPoint;
use crate::network::GpsPoint;
use crate::transition::Candidate;

use std::collections::VecDeque;

/// One candidate at one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct TrellisState {
    pub candidate: Candidate,

    pub emission: f64,

    /// The score of the move from the parent, zero at the start of a run.
    pub transition: f64,

    /// The log-likelihood of the best path ending in this state.
    pub cumulative: f64,

    /// Index of the best predecessor within the previous layer.
    pub parent: Option<usize>,
}

/// The states of one observation. States are held in rank order,
/// so the first state is always the best.
#[derive(Clone, Debug)]
pub struct Layer {
    /// The position of the observation within its trace.
    pub index: usize,
    pub observation: GpsPoint,
    pub states: Vec<TrellisState>,
}

impl Layer {
    #[inline]
    pub fn best(&self) -> Option<&TrellisState> {
        self.states.first()
    }
}

/// The unsettled layers of the current run of a trace.
///
/// Layers are appended by the solver as observations arrive, and drained
/// from the front once they are settled. Observations which were rejected
/// while the run was open are held until the run settles past them.
#[derive(Clone, Debug, Default)]
pub struct Trellis {
    pub(crate) layers: VecDeque<Layer>,
    pub(crate) skipped: Vec<MatchedPoint>,

    /// Sum of the best cumulative score of each closed run.
    pub(crate) log_likelihood: f64,
}

impl Trellis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no run is open.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of unsettled layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn last(&self) -> Option<&Layer> {
        self.layers.back()
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Discards all layers, held observations and accumulated likelihood.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.skipped.clear();
        self.log_likelihood = 0.0;
    }
}
