pub mod trellis;
pub mod viterbi;

pub use trellis::*;
pub use viterbi::*;
