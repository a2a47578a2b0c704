use crate::network::{GpsPoint, RoadNetwork};
use roadmatch_fixtures::fixture_path;

use std::fs::File;
use std::io::BufReader;

pub fn init_network(name: &str) -> RoadNetwork {
    RoadNetwork::from_file(fixture_path(name)).expect("fixture network must load")
}

pub fn init_trace(name: &str) -> Vec<GpsPoint> {
    let file = File::open(fixture_path(name)).expect("fixture trace must exist");
    serde_json::from_reader(BufReader::new(file)).expect("fixture trace must decode")
}
