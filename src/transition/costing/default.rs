pub mod emission {
    use crate::transition::*;

    // 10 meters (85th% GPS error)
    pub const DEFAULT_GPS_SIGMA: f64 = 10.0;

    /// Scores a candidate by a zero-mean Gaussian model of cross-track
    /// GPS error, with standard deviation `sigma` (meters).
    ///
    /// ## Calculation
    ///
    /// ```math
    /// emission(d) = -d² / (2σ²)
    /// ```
    ///
    /// The score is strictly decreasing in the perpendicular distance `d`.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct GaussianEmission {
        pub sigma: f64,
    }

    impl Default for GaussianEmission {
        fn default() -> Self {
            GaussianEmission {
                sigma: DEFAULT_GPS_SIGMA,
            }
        }
    }

    impl<'a> Strategy<EmissionContext<'a>> for GaussianEmission {
        type Cost = f64;

        #[inline(always)]
        fn calculate(&self, context: EmissionContext<'a>) -> Self::Cost {
            let distance = context.distance();
            -(distance * distance) / (2.0 * self.sigma * self.sigma)
        }
    }
}

pub mod transition {
    use crate::transition::*;

    pub const DEFAULT_DECAY: f64 = 5.0;

    /// Added on top of the worst reachable score for a pair of candidates
    /// with no route between them within the bound.
    pub const DISCONNECTED_PENALTY: f64 = 1_000.0;

    /// Scores a move between two candidates by how closely the route
    /// between them agrees with the straightline distance between their
    /// observations.
    ///
    /// # Calculation
    ///
    /// The transition probability decays exponentially in the mismatch
    /// `|route - great_circle|` with decay constant `β`, so its log is:
    ///
    /// ```math
    /// transition(Δ) = -Δ / β
    /// ```
    ///
    /// ## Disconnected Candidates
    /// A target which cannot be reached within the route bound `b` scores
    /// `-(b / β) - DISCONNECTED_PENALTY`. A reachable mismatch never exceeds
    /// the bound, so this is worse than every reachable move but still finite.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ExponentialTransition {
        pub decay: f64,
    }

    impl Default for ExponentialTransition {
        fn default() -> Self {
            ExponentialTransition {
                decay: DEFAULT_DECAY,
            }
        }
    }

    impl<'a> Strategy<TransitionContext<'a>> for ExponentialTransition {
        type Cost = f64;

        #[inline(always)]
        fn calculate(&self, context: TransitionContext<'a>) -> Self::Cost {
            match context.lengths() {
                Some(lengths) => -lengths.mismatch() / self.decay,
                None => -(context.route_bound / self.decay) - DISCONNECTED_PENALTY,
            }
        }
    }
}

pub mod costing {
    use crate::config::MatchConfig;
    use crate::transition::*;

    pub struct CostingStrategies<E, T>
    where
        E: EmissionStrategy,
        T: TransitionStrategy,
    {
        emission: E,
        transition: T,
    }

    impl<E, T> CostingStrategies<E, T>
    where
        E: EmissionStrategy,
        T: TransitionStrategy,
    {
        pub fn new(emission: E, transition: T) -> Self {
            Self {
                emission,
                transition,
            }
        }
    }

    impl<E, T> Costing<E, T> for CostingStrategies<E, T>
    where
        T: TransitionStrategy,
        E: EmissionStrategy,
    {
        #[inline(always)]
        fn emission(&self, context: EmissionContext) -> f64 {
            self.emission.score(context)
        }

        #[inline(always)]
        fn transition(&self, context: TransitionContext) -> f64 {
            self.transition.score(context)
        }
    }

    impl CostingStrategies<GaussianEmission, ExponentialTransition> {
        /// The default models, parameterised by the configuration.
        pub fn from_config(config: &MatchConfig) -> Self {
            CostingStrategies::new(
                GaussianEmission {
                    sigma: config.gps_sigma_meters,
                },
                ExponentialTransition {
                    decay: config.transition_decay_constant,
                },
            )
        }
    }

    impl Default for CostingStrategies<GaussianEmission, ExponentialTransition> {
        fn default() -> Self {
            let emission = GaussianEmission::default();
            let transition = ExponentialTransition::default();

            CostingStrategies::new(emission, transition)
        }
    }
}

pub use costing::*;
pub use emission::*;
pub use transition::*;
