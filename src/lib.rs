#![doc = include_str!("../README.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod config;
pub mod error;
pub mod matcher;
pub mod network;
pub mod pipeline;
pub mod transition;
pub mod util;

pub use config::MatchConfig;
pub use error::Error;
pub use matcher::{MapMatcher, MatchStatus, MatchedPath, MatchedPoint, TraceHandle};
pub use network::{GpsPoint, RoadNetwork, RoadSegment, Scan, SegmentId};
