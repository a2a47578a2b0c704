use crate::network::{Coordinate, GpsPoint, Location, RoadNetwork, Scan, SegmentId};

use log::debug;
#[cfg(feature = "tracing")]
use tracing::Level;
use wkt::ToWkt;

/// A segment near an observation, and where upon it the observation projects.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: SegmentId,
    pub location: Location,

    /// The projected position on the segment's polyline.
    pub position: Coordinate,

    /// Perpendicular (haversine) distance from the observation, in meters.
    pub distance: f64,
}

impl Candidate {
    /// Ordering used to break ties: lowest segment id, then shortest
    /// perpendicular distance.
    #[inline]
    pub fn tie_order(&self, other: &Candidate) -> std::cmp::Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.distance.total_cmp(&other.distance))
    }
}

/// Finds the candidates of an observation within a fixed search radius.
#[derive(Clone, Copy, Debug)]
pub struct CandidateGenerator<'a> {
    network: &'a RoadNetwork,
    radius: f64,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(network: &'a RoadNetwork, radius: f64) -> Self {
        Self { network, radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns every candidate within the radius, sorted by distance and then
    /// by id. An empty result means the observation is unmatched.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self)))]
    pub fn generate(&self, observation: &GpsPoint) -> Vec<Candidate> {
        let candidates = self
            .network
            .query(&observation.coordinate(), self.radius)
            .into_iter()
            .filter(|projected| projected.distance <= self.radius)
            .filter_map(|projected| {
                let segment = self.network.segment(projected.location.segment)?;

                Some(Candidate {
                    id: segment.id.clone(),
                    location: projected.location,
                    position: projected.position,
                    distance: projected.distance,
                })
            })
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            debug!(
                "No candidates within {}m of {}",
                self.radius,
                observation.coordinate().point().wkt_string()
            );
        }

        candidates
    }
}
