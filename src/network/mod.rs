pub mod codec;
pub mod error;
pub mod graph;
pub mod reach;
pub mod scan;
pub mod segment;

pub use error::LoadError;
pub use graph::{RoadNetwork, SegmentIx, SegmentPiece};
pub use reach::Reach;
pub use scan::{Location, Projected, Scan};
pub use segment::{Coordinate, GpsPoint, RoadSegment, SegmentId};
