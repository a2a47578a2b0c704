use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The stable identifier of a [`RoadSegment`].
///
/// Identifiers may be numeric or textual. Numeric identifiers are
/// ordered numerically and always sort before textual identifiers,
/// which are ordered lexicographically. This ordering is what
/// "lowest segment id" refers to when breaking ties in the solver.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentId {
    Numeric(u64),
    Named(String),
}

impl Display for SegmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentId::Numeric(id) => write!(f, "{id}"),
            SegmentId::Named(id) => write!(f, "{id}"),
        }
    }
}

impl From<u64> for SegmentId {
    fn from(value: u64) -> Self {
        SegmentId::Numeric(value)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        SegmentId::Named(value.to_string())
    }
}

impl From<String> for SegmentId {
    fn from(value: String) -> Self {
        SegmentId::Named(value)
    }
}

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components are finite and within the WGS84 domain.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// The position as a [`geo::Point`], which is ordered `(x = lon, y = lat)`.
    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    /// Great-circle distance to `other`, in meters.
    #[inline]
    pub fn distance(&self, other: &Coordinate) -> f64 {
        Haversine.distance(self.point(), other.point())
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Coordinate::new(point.y(), point.x())
    }
}

/// A road segment, described by an ordered polyline of at least two coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSegment {
    pub id: SegmentId,
    pub polyline: Vec<Coordinate>,
}

impl RoadSegment {
    pub fn new(id: impl Into<SegmentId>, polyline: Vec<Coordinate>) -> Self {
        Self {
            id: id.into(),
            polyline,
        }
    }

    /// The haversine length of the polyline, in meters.
    pub fn length(&self) -> f64 {
        self.polyline
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum()
    }
}

/// A single GPS observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub lat: f64,
    pub lon: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl GpsPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            timestamp: None,
        }
    }

    pub fn at(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.coordinate().is_valid()
    }
}
