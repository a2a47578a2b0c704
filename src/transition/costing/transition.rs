use crate::transition::{Candidate, Strategy};

pub trait TransitionStrategy: for<'a> Strategy<TransitionContext<'a>> {}
impl<T> TransitionStrategy for T where T: for<'a> Strategy<TransitionContext<'a>> {}

#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    /// The source candidate indicating the segment and
    /// position for which the move begins at.
    pub source: &'a Candidate,

    /// The target candidate indicating the segment and
    /// position for which the move ends at.
    pub target: &'a Candidate,

    /// The great circle distance between the two observations.
    pub great_circle_distance: f64,

    /// The shortest route along the network between the two candidates,
    /// or `None` if the target cannot be reached within [`route_bound`](#structfield.route_bound).
    pub route_distance: Option<f64>,

    /// The furthest route distance that was searched.
    pub route_bound: f64,
}

pub struct TransitionLengths {
    /// The great circle distance between the observations
    pub straightline_distance: f64,

    /// The length of the route between the candidates
    pub route_length: f64,
}

impl TransitionLengths {
    /// The absolute difference between the route length and the
    /// straightline distance, in meters.
    ///
    /// A move along a straight road between two observations has a
    /// mismatch near zero, whilst detours and backtracking grow it.
    ///
    /// For example:
    /// -   If two observations were `100m` apart, and the route between
    ///     their candidates was `130m`, the mismatch is `30m`.
    /// -   If the same observations instead had candidates joined by a
    ///     `250m` route, the mismatch is `150m`.
    #[inline]
    pub fn mismatch(&self) -> f64 {
        (self.route_length - self.straightline_distance).abs()
    }
}

impl TransitionContext<'_> {
    /// Returns the (Source, Target) candidates
    pub fn candidates(&self) -> (&Candidate, &Candidate) {
        (self.source, self.target)
    }

    /// Whether the target was reached from the source within the bound.
    pub fn is_reachable(&self) -> bool {
        self.route_distance.is_some()
    }

    pub fn lengths(&self) -> Option<TransitionLengths> {
        Some(TransitionLengths {
            straightline_distance: self.great_circle_distance,
            route_length: self.route_distance?,
        })
    }
}

/// Limits how far the route search may extend for a move between two
/// observations: `max(minimum, factor × great_circle_distance)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteBound {
    pub factor: f64,
    pub minimum: f64,
}

impl Default for RouteBound {
    fn default() -> Self {
        RouteBound {
            factor: 4.0,
            minimum: 2_000.0,
        }
    }
}

impl RouteBound {
    #[inline]
    pub fn for_distance(&self, great_circle_distance: f64) -> f64 {
        self.minimum.max(self.factor * great_circle_distance)
    }
}
