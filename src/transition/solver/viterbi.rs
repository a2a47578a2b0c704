use crate::matcher::MatchedPoint;
use crate::network::{GpsPoint, RoadNetwork};
use crate::transition::*;

use log::debug;
use measure_time::debug_time;
use rustc_hash::FxHashSet;

use std::cmp::Ordering;
#[cfg(feature = "tracing")]
use tracing::Level;

/// Advances a [`Trellis`] one observation at a time, using the
/// max-recurrence of the Viterbi algorithm with a bounded beam.
///
/// ## Runs
/// Consecutive observations with candidates form a run. An observation
/// without candidates closes the run (it is backtraced and settled) and
/// the next observation with candidates opens a fresh one.
///
/// ## Convergence
/// After each step the ancestry of the latest layer is walked backwards.
/// Once every live state descends from a single earlier state, the layers
/// up to and including that state can never change, so they are settled
/// and dropped from the trellis.
pub struct ViterbiSolver<'a, E, T>
where
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    network: &'a RoadNetwork,
    costing: &'a CostingStrategies<E, T>,

    beam_width: usize,
    bound: RouteBound,
}

impl<'a, E, T> ViterbiSolver<'a, E, T>
where
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    pub fn new(
        network: &'a RoadNetwork,
        costing: &'a CostingStrategies<E, T>,
        beam_width: usize,
        bound: RouteBound,
    ) -> Self {
        Self {
            network,
            costing,
            beam_width: beam_width.max(1),
            bound,
        }
    }

    /// Folds the observation at `index` into the trellis, returning the
    /// points which became settled as a result, in trace order.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self, trellis, observation, candidates)))]
    pub fn advance(
        &self,
        trellis: &mut Trellis,
        index: usize,
        observation: GpsPoint,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<MatchedPoint>, MatchError> {
        if candidates.is_empty() {
            let mut settled = self.close(trellis)?;
            settled.push(MatchedPoint::unmatched(index, observation));
            return Ok(settled);
        }

        let states = match trellis.layers.back() {
            None => self.initial(&observation, candidates),
            Some(previous) => self.step(previous, &observation, candidates)?,
        };

        trellis.layers.push_back(Layer {
            index,
            observation,
            states,
        });

        self.converge(trellis)
    }

    /// Records an observation which cannot enter the trellis as unmatched,
    /// without interrupting the open run.
    pub fn skip(&self, trellis: &mut Trellis, index: usize, observation: GpsPoint) -> Vec<MatchedPoint> {
        let point = MatchedPoint::unmatched(index, observation);

        if trellis.is_empty() {
            vec![point]
        } else {
            trellis.skipped.push(point);
            vec![]
        }
    }

    /// Backtraces and settles the open run, leaving the trellis empty.
    ///
    /// The best cumulative score of the run is added to the trellis'
    /// log-likelihood.
    pub fn close(&self, trellis: &mut Trellis) -> Result<Vec<MatchedPoint>, MatchError> {
        let skipped = std::mem::take(&mut trellis.skipped);

        let Some(last) = trellis.layers.back() else {
            return Ok(skipped);
        };

        let best = last
            .best()
            .ok_or(InvariantError::EmptyLayer { observation: last.index })?;

        debug!(
            "Closing run of {} layer(s) ending at observation {} with likelihood {}",
            trellis.layers.len(),
            last.index,
            best.cumulative
        );

        let cumulative = best.cumulative;
        let path = self.backtrace(trellis, trellis.layers.len() - 1, 0)?;

        trellis.log_likelihood = finite(trellis.log_likelihood + cumulative);
        trellis.layers.clear();

        Ok(merge(path, skipped))
    }

    fn initial(&self, observation: &GpsPoint, candidates: Vec<Candidate>) -> Vec<TrellisState> {
        let states = candidates
            .into_iter()
            .map(|candidate| {
                let emission = self
                    .costing
                    .emission(EmissionContext::new(&candidate, observation));

                TrellisState {
                    candidate,
                    emission,
                    transition: 0.0,
                    cumulative: emission,
                    parent: None,
                }
            })
            .collect();

        self.prune(states)
    }

    fn step(
        &self,
        previous: &Layer,
        observation: &GpsPoint,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<TrellisState>, MatchError> {
        debug_time!("ViterbiSolver::step");

        let great_circle_distance = previous
            .observation
            .coordinate()
            .distance(&observation.coordinate());
        let route_bound = self.bound.for_distance(great_circle_distance);

        // One search per predecessor serves every successor
        let reaches = previous
            .states
            .iter()
            .map(|state| self.network.reach(&state.candidate.location, route_bound))
            .collect::<Vec<_>>();

        let mut states = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let emission = self
                .costing
                .emission(EmissionContext::new(&candidate, observation));

            let mut best: Option<(usize, f64, f64)> = None;

            for (parent, (source, reach)) in previous.states.iter().zip(&reaches).enumerate() {
                let transition = self.costing.transition(TransitionContext {
                    source: &source.candidate,
                    target: &candidate,
                    great_circle_distance,
                    route_distance: reach.distance_to(self.network, &candidate.location),
                    route_bound,
                });

                let cumulative = finite(source.cumulative + transition + emission);

                let improves = match best {
                    None => true,
                    Some((current, _, score)) => match cumulative.total_cmp(&score) {
                        Ordering::Greater => true,
                        Ordering::Less => false,
                        Ordering::Equal => source
                            .candidate
                            .tie_order(&previous.states[current].candidate)
                            .is_lt(),
                    },
                };

                if improves {
                    best = Some((parent, transition, cumulative));
                }
            }

            let (parent, transition, cumulative) = best.ok_or(InvariantError::EmptyLayer {
                observation: previous.index,
            })?;

            states.push(TrellisState {
                candidate,
                emission,
                transition,
                cumulative,
                parent: Some(parent),
            });
        }

        Ok(self.prune(states))
    }

    /// Retains the best `beam_width` states, in rank order.
    fn prune(&self, mut states: Vec<TrellisState>) -> Vec<TrellisState> {
        states.sort_by(|a, b| {
            b.cumulative
                .total_cmp(&a.cumulative)
                .then_with(|| a.candidate.tie_order(&b.candidate))
        });

        states.truncate(self.beam_width);
        states
    }

    fn converge(&self, trellis: &mut Trellis) -> Result<Vec<MatchedPoint>, MatchError> {
        let Some(last) = trellis.layers.back() else {
            return Ok(vec![]);
        };

        let mut frontier = (0..last.states.len()).collect::<FxHashSet<_>>();
        let mut depth = trellis.layers.len() - 1;

        while depth > 0 {
            let layer = &trellis.layers[depth];
            let previous = &trellis.layers[depth - 1];

            frontier = frontier
                .into_iter()
                .map(|state| -> Result<usize, InvariantError> {
                    let parent = layer.states[state]
                        .parent
                        .ok_or(InvariantError::MissingParent {
                            observation: layer.index,
                            state,
                        })?;

                    if parent >= previous.states.len() {
                        return Err(InvariantError::DanglingParent {
                            observation: layer.index,
                            state,
                        });
                    }

                    Ok(parent)
                })
                .collect::<Result<FxHashSet<_>, _>>()?;

            depth -= 1;

            if let (1, Some(state)) = (frontier.len(), frontier.iter().next().copied()) {
                return self.settle(trellis, depth, state);
            }
        }

        Ok(vec![])
    }

    /// Settles the layers up to and including `depth`, through `state`.
    fn settle(
        &self,
        trellis: &mut Trellis,
        depth: usize,
        state: usize,
    ) -> Result<Vec<MatchedPoint>, MatchError> {
        let path = self.backtrace(trellis, depth, state)?;

        trellis.layers.drain(..=depth);

        let boundary = match trellis.layers.front_mut() {
            Some(first) => {
                first.states.iter_mut().for_each(|state| state.parent = None);
                first.index
            }
            None => usize::MAX,
        };

        let (skipped, held): (Vec<_>, Vec<_>) = std::mem::take(&mut trellis.skipped)
            .into_iter()
            .partition(|point| point.index < boundary);
        trellis.skipped = held;

        debug!("Settled {} observation(s) through convergence", path.len() + skipped.len());
        Ok(merge(path, skipped))
    }

    /// Follows back-pointers from `state` in the layer at `depth`.
    fn backtrace(
        &self,
        trellis: &Trellis,
        depth: usize,
        state: usize,
    ) -> Result<Vec<MatchedPoint>, MatchError> {
        let mut path = Vec::with_capacity(depth + 1);
        let mut cursor = state;

        for position in (0..=depth).rev() {
            let layer = &trellis.layers[position];
            let selected = layer
                .states
                .get(cursor)
                .ok_or(InvariantError::DanglingParent {
                    observation: layer.index,
                    state: cursor,
                })?;

            path.push(MatchedPoint::matched(
                layer.index,
                layer.observation,
                selected.candidate.id.clone(),
            ));

            if position > 0 {
                cursor = selected.parent.ok_or(InvariantError::MissingParent {
                    observation: layer.index,
                    state: cursor,
                })?;
            }
        }

        path.reverse();
        Ok(path)
    }
}

#[inline]
fn finite(score: f64) -> f64 {
    score.max(-f64::MAX).min(f64::MAX)
}

/// Interleaves two index-ordered sequences of points.
fn merge(path: Vec<MatchedPoint>, skipped: Vec<MatchedPoint>) -> Vec<MatchedPoint> {
    if skipped.is_empty() {
        return path;
    }

    let mut points = path;
    points.extend(skipped);
    points.sort_by_key(|point| point.index);
    points
}
