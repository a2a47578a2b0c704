use crate::network::{GpsPoint, SegmentId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of matching one observation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<SegmentId>", into = "Option<SegmentId>")]
pub enum MatchStatus {
    Matched(SegmentId),

    /// No segment lay within the search radius, or the observation was invalid.
    Unmatched,
}

impl MatchStatus {
    pub fn segment(&self) -> Option<&SegmentId> {
        match self {
            MatchStatus::Matched(id) => Some(id),
            MatchStatus::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchStatus::Matched(_))
    }
}

impl From<Option<SegmentId>> for MatchStatus {
    fn from(value: Option<SegmentId>) -> Self {
        value.map_or(MatchStatus::Unmatched, MatchStatus::Matched)
    }
}

impl From<MatchStatus> for Option<SegmentId> {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::Matched(id) => Some(id),
            MatchStatus::Unmatched => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchedPoint {
    /// Position of the observation within its trace.
    pub index: usize,
    pub observation: GpsPoint,
    pub status: MatchStatus,
}

impl MatchedPoint {
    pub fn matched(index: usize, observation: GpsPoint, id: SegmentId) -> Self {
        Self {
            index,
            observation,
            status: MatchStatus::Matched(id),
        }
    }

    pub fn unmatched(index: usize, observation: GpsPoint) -> Self {
        Self {
            index,
            observation,
            status: MatchStatus::Unmatched,
        }
    }
}

/// The persisted shape of a [`MatchedPoint`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub observation: GpsPoint,
    pub matched_segment: MatchStatus,
}

impl From<&MatchedPoint> for MatchRecord {
    fn from(point: &MatchedPoint) -> Self {
        MatchRecord {
            observation: point.observation,
            matched_segment: point.status.clone(),
        }
    }
}

/// One point per input observation, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchedPath {
    pub points: Vec<MatchedPoint>,

    /// Sum of the best cumulative log-likelihood of every run.
    pub log_likelihood: f64,
}

impl MatchedPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn statuses(&self) -> impl Iterator<Item = &MatchStatus> {
        self.points.iter().map(|point| &point.status)
    }

    /// The matched segment of every observation, `None` where unmatched.
    pub fn segment_ids(&self) -> Vec<Option<SegmentId>> {
        self.statuses().map(|status| status.segment().cloned()).collect()
    }

    pub fn matched_count(&self) -> usize {
        self.statuses().filter(|status| status.is_matched()).count()
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.points.iter().map(MatchRecord::from).collect()
    }

    /// Splits the records into parts of at most `size` records each.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = &[MatchedPoint]> {
        self.points.chunks(size.max(1))
    }
}

/// A result document in the persisted layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub timestamp_utc: DateTime<Utc>,
    pub trace: String,
    pub matched_data: Vec<MatchRecord>,
}

impl ResultDocument {
    pub fn new(trace: impl Into<String>, matched_data: Vec<MatchRecord>) -> Self {
        ResultDocument {
            timestamp_utc: Utc::now(),
            trace: trace.into(),
            matched_data,
        }
    }
}
