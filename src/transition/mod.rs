//! A Hidden-Markov-Model (HMM) matching
//! module that matches raw observations
//! onto the segments of a road network.

pub mod candidate;
pub mod costing;
pub mod error;
pub mod solver;


// Re-Exports
#[doc(hidden)]
pub use candidate::*;
#[doc(hidden)]
pub use costing::*;
#[doc(hidden)]
pub use error::*;
#[doc(hidden)]
pub use solver::*;
