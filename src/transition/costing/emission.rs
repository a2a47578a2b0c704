use crate::network::GpsPoint;
use crate::transition::{Candidate, Strategy};

pub trait EmissionStrategy: for<'a> Strategy<EmissionContext<'a>> {}
impl<T> EmissionStrategy for T where T: for<'a> Strategy<EmissionContext<'a>> {}

#[derive(Clone, Copy, Debug)]
pub struct EmissionContext<'a> {
    /// The proposed (candidate) position to be matched onto.
    ///
    /// This belongs to the network, and is not provided
    /// as input to the match query.
    pub candidate: &'a Candidate,

    /// The observation the costing method is matching.
    pub observation: &'a GpsPoint,
}

impl<'a> EmissionContext<'a> {
    pub fn new(candidate: &'a Candidate, observation: &'a GpsPoint) -> Self {
        Self {
            candidate,
            observation,
        }
    }

    /// Perpendicular distance, in meters, from the observation to the candidate.
    #[inline]
    pub fn distance(&self) -> f64 {
        self.candidate.distance
    }
}
