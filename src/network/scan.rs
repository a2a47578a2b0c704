use crate::network::graph::{wrap_longitude, SegmentPiece};
use crate::network::{Coordinate, RoadNetwork, SegmentIx};

use geo::{Destination, Distance, Geodesic, Haversine, Point};
use itertools::Itertools;
use rstar::AABB;
use rustc_hash::FxHashMap;
#[cfg(feature = "tracing")]
use tracing::Level;

/// The envelope is widened slightly beyond the radius, since the
/// geodesic box and the haversine filter disagree by a fraction of a percent.
const ENVELOPE_PADDING: f64 = 1.05;

/// A position along a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub segment: SegmentIx,

    /// Distance (meters) from the first coordinate of the segment's
    /// polyline, measured along the polyline.
    pub along: f64,
}

/// The nearest point of a segment to some query position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub location: Location,

    /// The projected point upon the segment's polyline.
    pub position: Coordinate,

    /// The perpendicular (haversine) distance, in meters, from the
    /// query position to [`position`](#field.position).
    pub distance: f64,
}

/// Proximity queries over a [`RoadNetwork`].
pub trait Scan {
    /// Returns every polyline piece whose bounding box intersects the
    /// square of half-side `distance` (meters) around `point`.
    ///
    /// ### Note
    /// This is a square-scan, a superset of the pieces within the radius.
    /// Use [`Scan::query`] for an exact result. Near the antimeridian the
    /// square wraps onto both sides of it.
    fn scan_pieces(&self, point: &Point, distance: f64) -> impl Iterator<Item = &SegmentPiece>;

    /// Returns all segments with geometry within `radius` meters of `point`,
    /// each with its nearest projected point. One entry per segment, sorted
    /// by perpendicular distance and then by segment id.
    fn query(&self, point: &Coordinate, radius: f64) -> Vec<Projected>;
}

impl Scan for RoadNetwork {
    #[inline]
    fn scan_pieces(&self, point: &Point, distance: f64) -> impl Iterator<Item = &SegmentPiece> {
        let reach = distance * ENVELOPE_PADDING;

        let north = Geodesic.destination(*point, 0.0, reach);
        let east = Geodesic.destination(*point, 90.0, reach);
        let south = Geodesic.destination(*point, 180.0, reach);

        let half_width = wrap_longitude(east.x() - point.x()).abs();
        let (west, east) = (point.x() - half_width, point.x() + half_width);
        let (lower, upper) = (south.y(), north.y());

        // A square crossing the antimeridian is split into one box either side
        let (primary, wrapped) = if half_width >= 180.0 {
            (AABB::from_corners([-180.0, lower], [180.0, upper]), None)
        } else if east > 180.0 {
            (
                AABB::from_corners([west, lower], [180.0, upper]),
                Some(AABB::from_corners([-180.0, lower], [east - 360.0, upper])),
            )
        } else if west < -180.0 {
            (
                AABB::from_corners([-180.0, lower], [east, upper]),
                Some(AABB::from_corners([west + 360.0, lower], [180.0, upper])),
            )
        } else {
            (AABB::from_corners([west, lower], [east, upper]), None)
        };

        std::iter::once(primary)
            .chain(wrapped)
            .flat_map(move |bbox| self.index.locate_in_envelope_intersecting(&bbox))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip(self)))]
    fn query(&self, point: &Coordinate, radius: f64) -> Vec<Projected> {
        let origin = point.point();
        let mut nearest: FxHashMap<SegmentIx, Projected> = FxHashMap::default();

        for piece in self.scan_pieces(&origin, radius) {
            let Some((position, along)) = piece.project(&origin) else {
                continue;
            };

            let distance = Haversine.distance(position, origin);
            if !(distance <= radius) {
                continue;
            }

            let length = self.segment_length(piece.segment).unwrap_or(along);
            let projected = Projected {
                location: Location {
                    segment: piece.segment,
                    along: along.clamp(0.0, length),
                },
                position: Coordinate::from(position),
                distance,
            };

            // Polylines span many pieces, only the closest is kept
            nearest
                .entry(piece.segment)
                .and_modify(|existing| {
                    if projected.distance < existing.distance {
                        *existing = projected;
                    }
                })
                .or_insert(projected);
        }

        nearest
            .into_values()
            .sorted_by(|a, b| {
                a.distance.total_cmp(&b.distance).then_with(|| {
                    let a = self.segment(a.location.segment).map(|s| &s.id);
                    let b = self.segment(b.location.segment).map(|s| &s.id);
                    a.cmp(&b)
                })
            })
            .collect()
    }
}
