use crate::network::reach::to_centimeters;
use crate::network::{Coordinate, LoadError, RoadSegment, SegmentId};

use geo::{Distance, Haversine, InterpolatableLine, Line, Point};
use log::{debug, info};
use petgraph::graph::{NodeIndex, UnGraph};
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;

use std::fmt::{Debug, Formatter};
use std::time::Instant;
#[cfg(feature = "tracing")]
use tracing::Level;

/// Position of a segment within its [`RoadNetwork`].
pub type SegmentIx = usize;

/// Endpoint coordinates are quantised to 1e-7 degrees (~1cm) so that
/// segments which share an endpoint share a junction.
const JUNCTION_SCALE: f64 = 1e7;

pub(crate) type JunctionKey = (i64, i64);

/// An edge of the junction graph, i.e. a segment spanning two junctions.
#[derive(Clone, Copy, Debug)]
pub struct Corridor {
    pub segment: SegmentIx,

    /// The length of the segment in centimeters.
    pub length: u64,
}

pub(crate) type Junctions = UnGraph<JunctionKey, Corridor>;

/// A straight piece of a segment's polyline, as stored in the spatial index.
#[derive(Debug)]
pub struct SegmentPiece {
    pub segment: SegmentIx,
    pub line: Line,

    /// Along-segment distance (meters) at the start of the piece.
    pub offset: f64,
}

impl SegmentPiece {
    /// Projects `origin` onto the piece, returning the projected point
    /// and its along-segment distance.
    ///
    /// The fraction along the piece is located in a frame where longitude
    /// is scaled by the cosine of the piece's latitude, so that both axes
    /// are in equal units of distance.
    #[inline]
    pub fn project(&self, origin: &Point) -> Option<(Point, f64)> {
        let (start, end) = (self.line.start, self.line.end);
        let scale = ((start.y + end.y) / 2.0).to_radians().cos();

        let (dx, dy) = (wrap_longitude(end.x - start.x) * scale, end.y - start.y);
        let (px, py) = (
            wrap_longitude(origin.x() - start.x) * scale,
            origin.y() - start.y,
        );

        let squared = dx * dx + dy * dy;
        let fraction = if squared > 0.0 {
            ((px * dx + py * dy) / squared).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if !fraction.is_finite() {
            return None;
        }

        let position = self.line.point_at_ratio_from_start(&Haversine, fraction);
        let along = self.offset + Haversine.distance(self.line.start_point(), position);

        Some((position, along))
    }
}

/// Folds a longitude difference into `[-180, 180]`.
#[inline]
pub(crate) fn wrap_longitude(delta: f64) -> f64 {
    if delta > 180.0 {
        delta - 360.0
    } else if delta < -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

impl RTreeObject for SegmentPiece {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

pub(crate) struct SegmentEntry {
    pub segment: RoadSegment,
    pub length: f64,
    pub ends: (NodeIndex, NodeIndex),
}

/// An immutable road network.
///
/// Built once through [`RoadNetwork::load`], after which it is a
/// read-only resource that may be shared across threads. Proximity
/// queries are served by [`Scan`](crate::network::Scan) and route
/// distances by [`RoadNetwork::reach`].
///
/// Queries may wrap across the antimeridian, but a single polyline piece
/// must not cross it. Segments spanning ±180° must be split there by the
/// caller before loading.
pub struct RoadNetwork {
    pub(crate) segments: Vec<SegmentEntry>,
    pub(crate) lookup: FxHashMap<SegmentId, SegmentIx>,

    pub(crate) index: RTree<SegmentPiece>,
    pub(crate) junctions: Junctions,
}

impl Debug for RoadNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RoadNetwork with Segments: {}, Junctions: {}",
            self.segments.len(),
            self.junctions.node_count()
        )
    }
}

impl RoadNetwork {
    /// Builds the network, its spatial index and its junction graph.
    ///
    /// Fails if any segment has fewer than two coordinates, an invalid
    /// coordinate, zero length, or an id already used by another segment.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, level = Level::INFO))]
    pub fn load(segments: impl IntoIterator<Item = RoadSegment>) -> Result<RoadNetwork, LoadError> {
        let start_time = Instant::now();

        let mut entries: Vec<SegmentEntry> = Vec::new();
        let mut lookup: FxHashMap<SegmentId, SegmentIx> = FxHashMap::default();
        let mut pieces: Vec<SegmentPiece> = Vec::new();

        let mut junctions = Junctions::default();
        let mut junction_lookup: FxHashMap<JunctionKey, NodeIndex> = FxHashMap::default();

        for segment in segments {
            Self::validate(&segment)?;

            if lookup.contains_key(&segment.id) {
                return Err(LoadError::DuplicateId { id: segment.id });
            }

            let ix = entries.len();
            let mut offset = 0.0;
            let mut segment_pieces = Vec::with_capacity(segment.polyline.len() - 1);

            for pair in segment.polyline.windows(2) {
                let length = pair[0].distance(&pair[1]);

                // Repeated vertices produce no geometry to project onto
                if length > 0.0 {
                    segment_pieces.push(SegmentPiece {
                        segment: ix,
                        line: Line::new(pair[0].point(), pair[1].point()),
                        offset,
                    });
                }

                offset += length;
            }

            if !(offset > 0.0) {
                return Err(LoadError::ZeroLength { id: segment.id });
            }

            let (first, last) = match (segment.polyline.first(), segment.polyline.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => {
                    return Err(LoadError::TooFewCoordinates {
                        id: segment.id,
                        count: 0,
                    })
                }
            };

            let source = Self::junction(&mut junctions, &mut junction_lookup, &first);
            let target = Self::junction(&mut junctions, &mut junction_lookup, &last);

            junctions.add_edge(
                source,
                target,
                Corridor {
                    segment: ix,
                    length: to_centimeters(offset),
                },
            );

            pieces.extend(segment_pieces);
            lookup.insert(segment.id.clone(), ix);
            entries.push(SegmentEntry {
                segment,
                length: offset,
                ends: (source, target),
            });
        }

        debug!("Segment ingestion took: {:?}", start_time.elapsed());

        let piece_count = pieces.len();
        let index = RTree::bulk_load(pieces);

        info!(
            "Finished. Loaded {} segments ({} pieces, {} junctions) in {}ms",
            entries.len(),
            piece_count,
            junctions.node_count(),
            start_time.elapsed().as_millis()
        );

        Ok(RoadNetwork {
            segments: entries,
            lookup,
            index,
            junctions,
        })
    }

    fn validate(segment: &RoadSegment) -> Result<(), LoadError> {
        if segment.polyline.len() < 2 {
            return Err(LoadError::TooFewCoordinates {
                id: segment.id.clone(),
                count: segment.polyline.len(),
            });
        }

        if let Some(position) = segment.polyline.iter().position(|c| !c.is_valid()) {
            return Err(LoadError::InvalidCoordinate {
                id: segment.id.clone(),
                position,
            });
        }

        Ok(())
    }

    fn junction(
        junctions: &mut Junctions,
        lookup: &mut FxHashMap<JunctionKey, NodeIndex>,
        coordinate: &Coordinate,
    ) -> NodeIndex {
        let key = (
            (coordinate.lat * JUNCTION_SCALE).round() as i64,
            (coordinate.lon * JUNCTION_SCALE).round() as i64,
        );

        *lookup
            .entry(key)
            .or_insert_with(|| junctions.add_node(key))
    }

    /// The number of segments in the network.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn segment(&self, ix: SegmentIx) -> Option<&RoadSegment> {
        self.segments.get(ix).map(|entry| &entry.segment)
    }

    /// Looks up a segment by its identifier.
    pub fn get(&self, id: &SegmentId) -> Option<&RoadSegment> {
        self.lookup.get(id).and_then(|ix| self.segment(*ix))
    }

    pub fn index_of(&self, id: &SegmentId) -> Option<SegmentIx> {
        self.lookup.get(id).copied()
    }

    /// The haversine length of a segment, in meters.
    #[inline]
    pub fn segment_length(&self, ix: SegmentIx) -> Option<f64> {
        self.segments.get(ix).map(|entry| entry.length)
    }

    pub fn segments(&self) -> impl Iterator<Item = &RoadSegment> {
        self.segments.iter().map(|entry| &entry.segment)
    }

    /// Number of distinct segment endpoints.
    pub fn junction_count(&self) -> usize {
        self.junctions.node_count()
    }
}
