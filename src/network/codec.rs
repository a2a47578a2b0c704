//! Decoding of road networks from `edges.json` documents.
//!
//! The document is a JSON array of edges, each carrying its identifier
//! and a `gps.coordinates` list of `[lon, lat]` pairs.
//!
//! ```json
//! [{ "id": "S1", "gps": { "coordinates": [[0.0, 0.0], [1.0, 0.0]] } }]
//! ```

use crate::network::{Coordinate, LoadError, RoadNetwork, RoadSegment, SegmentId};

use log::info;
use serde::Deserialize;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct EdgeRecord {
    pub id: SegmentId,
    pub gps: EdgeGeometry,
}

#[derive(Debug, Deserialize)]
pub struct EdgeGeometry {
    pub coordinates: Vec<Vec<f64>>,
}

impl From<EdgeRecord> for RoadSegment {
    fn from(record: EdgeRecord) -> Self {
        let polyline = record
            .gps
            .coordinates
            .into_iter()
            .map(|pair| match pair.as_slice() {
                [lon, lat, ..] => Coordinate::new(*lat, *lon),
                // Rejected as an invalid coordinate when loaded
                _ => Coordinate::new(f64::NAN, f64::NAN),
            })
            .collect();

        RoadSegment::new(record.id, polyline)
    }
}

impl RoadNetwork {
    /// Decodes and loads a network from any reader of an `edges.json` document.
    pub fn from_reader(reader: impl Read) -> Result<RoadNetwork, LoadError> {
        let records: Vec<EdgeRecord> = serde_json::from_reader(reader)?;
        RoadNetwork::load(records.into_iter().map(RoadSegment::from))
    }

    /// Loads a network from an `edges.json` file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<RoadNetwork, LoadError> {
        let path = path.as_ref();
        info!("Loading road network from {}", path.display());

        let file = File::open(path)?;
        RoadNetwork::from_reader(BufReader::new(file))
    }
}
