//! You may override individual costing strategies
//! in order to apply custom functionality to the
//! solver. See the [`Strategy`] trait.
//!
//! ## Structure
//! Strategies are joined onto the aggregate [`CostingStrategies`]
//! structure, which is then supplied to the matcher.
//!
//! ```rust,ignore
//! use roadmatch::matcher::MapMatcher;
//! use roadmatch::transition::CostingStrategies;
//!
//! // Create default strategies
//! let costing = CostingStrategies::default();
//!
//! // Supply them to the relevant constructor
//! let matcher = MapMatcher::with_costing(&network, config, costing)?;
//!```
//!
//! To override the default strategies, simply apply your own
//! using [`CostingStrategies::new`]. You must create an [`EmissionStrategy`]
//! and [`TransitionStrategy`].
//!
//! ### Creating your own strategy / heuristic
//!
//! In order to make your own transition and emission strategies, you must
//! implement [`Strategy`] for your structure, with the context of the heuristic
//! you need to override.
//!
//! The higher-order traits, like [`TransitionStrategy`] are auto-derived for all
//! which implement [`Strategy<TransitionContext>`].
//!
//!```rust
//! use roadmatch::transition::{Strategy, TransitionContext};
//!
//! struct SameSegmentOnly;
//!
//! // Implement the strategy with the correct context.
//! impl<'a> Strategy<TransitionContext<'a>> for SameSegmentOnly {
//!    type Cost = f64;
//!
//!    fn calculate(&self, context: TransitionContext<'a>) -> Self::Cost {
//!        if context.source.id == context.target.id { 0.0 } else { -100.0 }
//!    }
//! }
//! ```
//!
//! ### Using Context
//! Each strategy accepts a context, defined in the
//! generic `Ctx` parameter of the [`Strategy`] trait.
//!
//! - [`TransitionContext`]
//!     Used for the transition costing strategy,
//!     supplies the candidates being moved between, the
//!     distance between their observations and the route between them.
//!
//! - [`EmissionContext`]
//!     Used to understand the cost associated with
//!     the selection of a candidate for an observation.
//!
//! ### Default Strategies:
//! - [`ExponentialTransition`]: Transition Cost
//! - [`GaussianEmission`]: Emission Cost
//!
#[doc(hidden)]
pub mod default;
#[doc(hidden)]
pub mod emission;
#[doc(hidden)]
pub mod transition;
#[doc(hidden)]
pub mod util;

#[doc(inline)]
pub use default::*;
#[doc(inline)]
pub use emission::*;
#[doc(inline)]
pub use transition::*;
#[doc(inline)]
pub use util::*;
