//! The matching facade.
//!
//! A [`MapMatcher`] borrows an immutable [`RoadNetwork`] and hands out
//! independent [`TraceHandle`]s, each of which owns the trellis of one
//! trace. Observations are fed to a handle one at a time, in order.
//!
//! ```rust,ignore
//! let matcher = MapMatcher::new(&network, MatchConfig::default())?;
//!
//! let mut handle = matcher.new_trace();
//! for observation in observations {
//!     let step = matcher.match_point(&mut handle, observation)?;
//!     persist(step.settled);
//! }
//!
//! let path = matcher.finish(&mut handle)?;
//! ```

pub mod result;

pub use result::*;

use crate::config::{ConfigError, MatchConfig};
use crate::network::{GpsPoint, RoadNetwork};
use crate::transition::*;

use log::{debug, warn};
use measure_time::debug_time;
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::Level;

/// The state of one trace being matched.
///
/// Handles are independent of one another and of the matcher which
/// created them, so they may be moved across threads freely.
#[derive(Clone, Debug, Default)]
pub struct TraceHandle {
    trellis: Trellis,
    next_index: usize,

    settled: Vec<MatchedPoint>,
    reported: usize,
}

impl TraceHandle {
    /// The number of observations fed to this handle.
    pub fn len(&self) -> usize {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// The points which can no longer change.
    pub fn settled(&self) -> &[MatchedPoint] {
        &self.settled
    }

    /// Removes and returns every settled point, including those not
    /// yet reported, so that a long-lived handle does not accumulate them.
    ///
    /// Taken points are no longer part of the path returned by
    /// [`MapMatcher::finish`].
    pub fn take_settled(&mut self) -> Vec<MatchedPoint> {
        self.reported = 0;
        std::mem::take(&mut self.settled)
    }

    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }

    fn clear(&mut self) {
        self.trellis.clear();
        self.next_index = 0;
        self.settled.clear();
        self.reported = 0;
    }

    /// Points settled since the last report.
    fn report(&mut self) -> Vec<MatchedPoint> {
        let fresh = self.settled[self.reported..].to_vec();
        self.reported = self.settled.len();
        fresh
    }
}

/// The outcome of feeding one observation to a handle.
#[derive(Clone, Debug, PartialEq)]
pub struct PointResult {
    /// Position of the observation within its trace.
    pub index: usize,

    /// The best-known status of this observation. Until the observation
    /// is settled, a later observation may change it.
    pub status: MatchStatus,

    /// Points which became settled since the previous result, in trace order.
    pub settled: Vec<MatchedPoint>,
}

pub struct MapMatcher<'a, E = GaussianEmission, T = ExponentialTransition>
where
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    network: &'a RoadNetwork,
    config: MatchConfig,
    costing: CostingStrategies<E, T>,
}

impl<'a> MapMatcher<'a> {
    /// Creates a matcher using the default models, parameterised by `config`.
    pub fn new(network: &'a RoadNetwork, config: MatchConfig) -> Result<Self, ConfigError> {
        let costing = CostingStrategies::from_config(&config);
        MapMatcher::with_costing(network, config, costing)
    }
}

impl<'a, E, T> MapMatcher<'a, E, T>
where
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    /// Creates a matcher using custom costing strategies. Only the search,
    /// beam and route-bound parameters of `config` are used.
    pub fn with_costing(
        network: &'a RoadNetwork,
        config: MatchConfig,
        costing: CostingStrategies<E, T>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(MapMatcher {
            network,
            config,
            costing,
        })
    }

    pub fn network(&self) -> &'a RoadNetwork {
        self.network
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn generator(&self) -> CandidateGenerator<'a> {
        CandidateGenerator::new(self.network, self.config.search_radius_meters)
    }

    fn solver(&self) -> ViterbiSolver<'_, E, T> {
        ViterbiSolver::new(
            self.network,
            &self.costing,
            self.config.beam_width,
            self.config.route_bound(),
        )
    }

    pub fn new_trace(&self) -> TraceHandle {
        TraceHandle::default()
    }

    /// Advances the handle by one observation.
    ///
    /// An invalid observation is recorded as unmatched at its index and
    /// reported through [`MatchError::InvalidObservation`]. The handle
    /// remains usable, and the next observation continues the trace.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self, handle)))]
    pub fn match_point(
        &self,
        handle: &mut TraceHandle,
        observation: GpsPoint,
    ) -> Result<PointResult, MatchError> {
        let index = handle.next_index;
        handle.next_index += 1;

        let solver = self.solver();

        if !observation.is_valid() {
            let settled = solver.skip(&mut handle.trellis, index, observation);
            handle.settled.extend(settled);

            return Err(MatchError::InvalidObservation {
                index,
                lat: observation.lat,
                lon: observation.lon,
            });
        }

        let candidates = self.generator().generate(&observation);
        let has_candidates = !candidates.is_empty();

        let settled = solver.advance(&mut handle.trellis, index, observation, candidates)?;
        handle.settled.extend(settled);

        let status = match handle.trellis.last().and_then(|layer| layer.best()) {
            Some(best) if has_candidates => MatchStatus::Matched(best.candidate.id.clone()),
            _ => MatchStatus::Unmatched,
        };

        Ok(PointResult {
            index,
            status,
            settled: handle.report(),
        })
    }

    /// Settles every remaining observation and returns the full path,
    /// leaving the handle empty and ready for a new trace.
    pub fn finish(&self, handle: &mut TraceHandle) -> Result<MatchedPath, MatchError> {
        let remaining = self.solver().close(&mut handle.trellis)?;
        handle.settled.extend(remaining);

        let path = MatchedPath {
            points: std::mem::take(&mut handle.settled),
            log_likelihood: handle.trellis.log_likelihood(),
        };

        debug!(
            "Finished trace of {} observation(s), {} matched, likelihood {}",
            path.len(),
            path.matched_count(),
            path.log_likelihood
        );

        handle.clear();
        Ok(path)
    }

    /// Discards the handle's trellis without producing a path.
    pub fn reset(&self, handle: &mut TraceHandle) {
        handle.clear();
    }

    /// Matches a whole trace on a fresh handle. Invalid observations are
    /// logged and marked unmatched.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all, fields(points = points.len())))]
    pub fn match_trace(&self, points: &[GpsPoint]) -> Result<MatchedPath, MatchError> {
        debug_time!("MapMatcher::match_trace");

        let mut handle = self.new_trace();

        for observation in points {
            match self.match_point(&mut handle, *observation) {
                Ok(_) => {}
                Err(err @ MatchError::InvalidObservation { .. }) => {
                    warn!("Skipping observation: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        self.finish(&mut handle)
    }
}

impl<E, T> MapMatcher<'_, E, T>
where
    E: EmissionStrategy + Sync,
    T: TransitionStrategy + Sync,
{
    /// Matches independent traces in parallel, returning one result per
    /// trace in input order.
    pub fn match_traces<P>(&self, traces: &[P]) -> Vec<Result<MatchedPath, MatchError>>
    where
        P: AsRef<[GpsPoint]> + Sync,
    {
        traces
            .par_iter()
            .map(|trace| self.match_trace(trace.as_ref()))
            .collect()
    }
}
