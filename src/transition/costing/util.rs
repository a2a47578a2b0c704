use crate::transition::{EmissionContext, EmissionStrategy, TransitionContext, TransitionStrategy};

pub trait Strategy<Ctx> {
    /// A calculable cost which can be any required
    /// type, so long as it is castable into a 64-bit float.
    type Cost: Into<f64>;

    /// The calculation cost you must implement, as a log-likelihood.
    /// Higher values are more likely.
    fn calculate(&self, context: Ctx) -> Self::Cost;

    /// The log-likelihood of the context, as used by the solver.
    ///
    /// ### Note
    /// The result is always finite. A calculation which underflows,
    /// or otherwise returns `NaN`, is clamped to `-f64::MAX` so that no
    /// candidate may carry zero probability mass.
    #[inline(always)]
    fn score(&self, ctx: Ctx) -> f64 {
        self.calculate(ctx).into().max(-f64::MAX).min(f64::MAX)
    }
}

pub trait Costing<Emission, Transition>
where
    Transition: TransitionStrategy,
    Emission: EmissionStrategy,
{
    fn emission(&self, context: EmissionContext) -> f64;
    fn transition(&self, context: TransitionContext) -> f64;
}
