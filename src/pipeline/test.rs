use crate::config::MatchConfig;
use crate::matcher::{MapMatcher, MatchRecord, MatchStatus, ResultDocument};
use crate::network::{GpsPoint, RoadNetwork, SegmentId};
use crate::pipeline::*;
use crate::util::fixture::init_network;
use roadmatch_fixtures::{fixture_path, EQUATOR_PAIR};

use approx::assert_relative_eq;
use std::collections::VecDeque;
use std::io::{BufReader, Cursor, Write};

/// Stores every document, failing the writes whose (zero-based) position
/// is listed in `fail_on`.
#[derive(Default)]
struct ScriptedSink {
    writes: usize,
    fail_on: Vec<usize>,
    documents: Vec<ResultDocument>,
}

impl ScriptedSink {
    fn failing(fail_on: impl IntoIterator<Item = usize>) -> Self {
        ScriptedSink {
            fail_on: fail_on.into_iter().collect(),
            ..ScriptedSink::default()
        }
    }
}

impl Sink for ScriptedSink {
    fn write(&mut self, document: &ResultDocument) -> Result<(), PipelineError> {
        let position = self.writes;
        self.writes += 1;

        if self.fail_on.contains(&position) {
            return Err(PipelineError::Io(std::io::Error::other("backend unavailable")));
        }

        self.documents.push(document.clone());
        Ok(())
    }
}

const EQUATOR_EVENTS: &str = r#"[
    { "lat": 0.0, "lon": 0.1, "timestamp": "2024-03-01T08:00:00Z", "trace": "north" },
    { "lat": 0.0, "lon": 0.4, "timestamp": "2024-03-01T08:00:10Z", "trace": "north" },
    { "lat": 5.0, "lon": 5.0, "trace": "south" },
    { "lat": 0.0, "lon": 1.1, "timestamp": "2024-03-01T08:00:20Z", "trace": "north" },
    { "lat": 0.0, "lon": 1.6, "timestamp": "2024-03-01T08:00:30Z", "trace": "north" }
]"#;

fn matcher(network: &RoadNetwork) -> MapMatcher<'_> {
    MapMatcher::new(network, MatchConfig::default()).expect("valid config")
}

fn segments(document: &ResultDocument) -> Vec<MatchStatus> {
    document
        .matched_data
        .iter()
        .map(|record| record.matched_segment.clone())
        .collect()
}

#[test_log::test]
fn groups_deliveries_into_traces() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let source = JsonArraySource::from_reader(Cursor::new(EQUATOR_EVENTS), 3).expect("decodes");
    let sink = ChunkedSink::new(ScriptedSink::default(), DEFAULT_CHUNK_SIZE);

    let mut pipeline = Pipeline::new(&matcher, source, sink);
    let summary = pipeline.run().expect("must run");

    assert_eq!(
        summary,
        PipelineSummary {
            deliveries: 5,
            traces: 2,
            matched: 4,
            unmatched: 1,
            failed_writes: 0,
        }
    );

    let (_, sink) = pipeline.into_parts();
    let documents = &sink.inner().documents;

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].trace, "north");
    assert_eq!(
        segments(&documents[0]),
        ["S1", "S1", "S2", "S2"].map(|id| MatchStatus::Matched(SegmentId::from(id)))
    );
    assert_eq!(documents[1].trace, "south");
    assert_eq!(segments(&documents[1]), vec![MatchStatus::Unmatched]);
}

#[test_log::test]
fn splits_large_traces_into_parts() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let events = (0..5)
        .map(|step| format!(r#"{{ "lat": 0.0, "lon": {} }}"#, 0.1 + step as f64 * 0.05))
        .collect::<Vec<_>>()
        .join("\n");

    let source = JsonLinesSource::new(Cursor::new(events), 3);
    let sink = ChunkedSink::new(ScriptedSink::default(), 2);

    let mut pipeline = Pipeline::new(&matcher, source, sink);
    pipeline.run().expect("must run");

    let (_, sink) = pipeline.into_parts();
    let documents = &sink.inner().documents;

    assert_eq!(
        documents
            .iter()
            .map(|document| document.matched_data.len())
            .collect::<Vec<_>>(),
        vec![2, 2, 1]
    );
    assert!(documents.iter().all(|document| document.trace == DEFAULT_TRACE));
    assert!(documents
        .iter()
        .all(|document| document.timestamp_utc == documents[0].timestamp_utc));
}

#[test_log::test]
fn failed_part_does_not_stop_remaining_parts() {
    let records = (0..5)
        .map(|step| MatchRecord {
            observation: GpsPoint::new(0.0, step as f64),
            matched_segment: MatchStatus::Unmatched,
        })
        .collect::<Vec<_>>();

    let mut sink = ChunkedSink::new(ScriptedSink::failing([1]), 2);
    let result = sink.write_records("partial", &records);

    assert!(matches!(
        result,
        Err(PipelineError::Write {
            failed: 1,
            parts: 3,
            ..
        })
    ));
    assert_eq!(sink.inner().writes, 3);
    assert_eq!(sink.inner().documents.len(), 2);
}

#[test_log::test]
fn failed_write_redelivers_the_trace() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let source = JsonArraySource::from_reader(Cursor::new(EQUATOR_EVENTS), 3).expect("decodes");
    let sink = ChunkedSink::new(ScriptedSink::failing([0]), DEFAULT_CHUNK_SIZE);

    let mut pipeline = Pipeline::new(&matcher, source, sink);
    let summary = pipeline.run().expect("must run");

    assert_eq!(summary.failed_writes, 1);
    assert_eq!(summary.traces, 2);
    assert_eq!(summary.deliveries, 5 + 4);

    let (mut source, sink) = pipeline.into_parts();
    let documents = &sink.inner().documents;

    // The south trace was written first, then the redelivered north trace
    assert_eq!(
        documents
            .iter()
            .map(|document| document.trace.as_str())
            .collect::<Vec<_>>(),
        vec!["south", "north"]
    );
    assert_eq!(documents[1].matched_data.len(), 4);

    // Every delivery has been settled
    assert!(matches!(
        source.acknowledge(0),
        Err(PipelineError::UnknownDelivery(0))
    ));
}

#[test_log::test]
fn redelivery_is_bounded() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let events = r#"[{ "lat": 0.0, "lon": 0.1 }, { "lat": 0.0, "lon": 0.2 }]"#;
    let source = JsonArraySource::from_reader(Cursor::new(events), 2).expect("decodes");
    let sink = ChunkedSink::new(ScriptedSink::failing(0..100), DEFAULT_CHUNK_SIZE);

    let mut pipeline = Pipeline::new(&matcher, source, sink);
    let summary = pipeline.run().expect("write failures are not fatal");

    assert_eq!(summary.failed_writes, 3);
    assert_eq!(summary.traces, 0);
    assert_eq!(summary.deliveries, 6);
}

/// Serves its events and then fails on every receive, as a broker does
/// once it times out, without ever reporting the end of the stream.
#[derive(Default)]
struct LiveSource {
    events: VecDeque<Event>,
    next_id: DeliveryId,
    acknowledged: Vec<DeliveryId>,
    acknowledged_at_failure: Option<usize>,
}

impl Source for LiveSource {
    fn receive(&mut self) -> Result<Option<Delivery>, PipelineError> {
        let Some(event) = self.events.pop_front() else {
            if self.acknowledged_at_failure.is_none() {
                self.acknowledged_at_failure = Some(self.acknowledged.len());
            }
            return Err(PipelineError::Io(std::io::Error::other("receive timeout")));
        };

        let id = self.next_id;
        self.next_id += 1;

        Ok(Some(Delivery {
            id,
            redelivery: 0,
            event,
        }))
    }

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.acknowledged.push(id);
        Ok(())
    }

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        Err(PipelineError::UnknownDelivery(id))
    }
}

fn along_the_equator(count: usize, step: f64) -> Vec<Event> {
    (0..count)
        .map(|index| Event {
            lat: 0.0,
            lon: 0.01 + index as f64 * step,
            timestamp: None,
            trace: "live".to_string(),
        })
        .collect()
}

fn longitudes(document: &ResultDocument) -> Vec<f64> {
    document
        .matched_data
        .iter()
        .map(|record| record.observation.lon)
        .collect()
}

#[test_log::test]
fn settled_points_are_written_while_the_stream_is_open() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let source = LiveSource {
        events: along_the_equator(50, 0.01).into(),
        ..LiveSource::default()
    };
    let sink = ChunkedSink::new(ScriptedSink::default(), DEFAULT_CHUNK_SIZE);

    let mut pipeline = Pipeline::new(&matcher, source, sink).with_flush_records(10);
    let result = pipeline.run();

    assert!(matches!(result, Err(PipelineError::Io(_))));

    let (source, sink) = pipeline.into_parts();

    // Four batches were settled, written and acknowledged before the
    // source failed, then the open tail was written on the way out.
    assert_eq!(source.acknowledged_at_failure, Some(40));
    assert_eq!(source.acknowledged, (0..50).collect::<Vec<_>>());
    assert_eq!(
        sink.inner()
            .documents
            .iter()
            .map(|document| document.matched_data.len())
            .collect::<Vec<_>>(),
        vec![10; 5]
    );
    assert!(sink
        .inner()
        .documents
        .iter()
        .flat_map(segments)
        .all(|status| status == MatchStatus::Matched(SegmentId::from("S1"))));
}

#[test_log::test]
fn failed_flush_restarts_the_trace_from_the_redelivered_points() {
    let network = init_network(EQUATOR_PAIR);
    let matcher = matcher(&network);

    let events = serde_json::to_string(&along_the_equator(5, 0.05)).expect("serializes");
    let source = JsonArraySource::from_reader(Cursor::new(events), 3).expect("decodes");
    let sink = ChunkedSink::new(ScriptedSink::failing([1]), DEFAULT_CHUNK_SIZE);

    let mut pipeline = Pipeline::new(&matcher, source, sink).with_flush_records(2);
    let summary = pipeline.run().expect("must run");

    assert_eq!(
        summary,
        PipelineSummary {
            deliveries: 5 + 3,
            traces: 1,
            matched: 5,
            unmatched: 0,
            failed_writes: 1,
        }
    );

    let (mut source, sink) = pipeline.into_parts();
    let written = sink
        .inner()
        .documents
        .iter()
        .map(longitudes)
        .collect::<Vec<_>>();

    assert_eq!(written.len(), 3);
    assert_relative_eq!(
        written.concat().as_slice(),
        [0.01, 0.06, 0.11, 0.16, 0.21].as_slice(),
        epsilon = 1e-12
    );
    assert_eq!(written.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);

    assert!(source.receive().expect("reads").is_none());
}

#[test_log::test]
fn json_lines_source_skips_blank_and_malformed_lines() {
    let input = "\n{ \"lat\": 0.0, \"lon\": 0.1 }\nnot json\n\n{ \"lat\": 0.0, \"lon\": 0.2, \"trace\": \"b\" }\n";
    let mut source = JsonLinesSource::new(Cursor::new(input), 0);

    let first = source.receive().expect("reads").expect("has an event");
    assert_eq!(first.event.trace, DEFAULT_TRACE);
    assert_eq!(first.event.observation(), GpsPoint::new(0.0, 0.1));

    let second = source.receive().expect("reads").expect("has an event");
    assert_eq!(second.event.trace, "b");

    assert!(source.receive().expect("reads").is_none());

    // Without redeliveries, a negative acknowledgement drops the delivery
    source.negative_acknowledge(first.id).expect("in flight");
    source.acknowledge(second.id).expect("in flight");
    assert!(source.receive().expect("reads").is_none());
}

#[test]
fn unknown_deliveries_are_rejected() {
    let mut source = JsonArraySource::from_reader(Cursor::new("[]"), 1).expect("decodes");

    assert!(matches!(
        source.negative_acknowledge(7),
        Err(PipelineError::UnknownDelivery(7))
    ));
}

#[test]
fn records_serialize_in_the_persisted_shape() {
    let matched = MatchRecord {
        observation: GpsPoint::new(0.0, 0.1),
        matched_segment: MatchStatus::Matched(SegmentId::from(12u64)),
    };
    let unmatched = MatchRecord {
        observation: GpsPoint::new(5.0, 5.0),
        matched_segment: MatchStatus::Unmatched,
    };

    assert_eq!(
        serde_json::to_value(&matched).expect("serializes"),
        serde_json::json!({ "observation": { "lat": 0.0, "lon": 0.1 }, "matched_segment": 12 })
    );
    assert_eq!(
        serde_json::to_value(&unmatched).expect("serializes"),
        serde_json::json!({ "observation": { "lat": 5.0, "lon": 5.0 }, "matched_segment": null })
    );
}

#[test_log::test]
fn runs_from_files_on_disk() {
    let network = RoadNetwork::from_file(fixture_path(EQUATOR_PAIR)).expect("fixture loads");
    let matcher = matcher(&network);

    let mut input = tempfile::NamedTempFile::new().expect("temp file");
    input
        .write_all(EQUATOR_EVENTS.as_bytes())
        .expect("writes events");

    let output = tempfile::NamedTempFile::new().expect("temp file");

    let source = JsonArraySource::from_reader(
        BufReader::new(std::fs::File::open(input.path()).expect("opens input")),
        3,
    )
    .expect("decodes");
    let sink = ChunkedSink::new(
        JsonLinesSink::new(output.reopen().expect("opens output")),
        DEFAULT_CHUNK_SIZE,
    );

    Pipeline::new(&matcher, source, sink)
        .run()
        .expect("must run");

    let written = std::fs::read_to_string(output.path()).expect("reads output");
    let documents = written
        .lines()
        .map(|line| serde_json::from_str::<ResultDocument>(line).expect("valid document"))
        .collect::<Vec<_>>();

    assert_eq!(documents.len(), 2);
    assert_eq!(
        documents[0].matched_data[0].observation.timestamp,
        Some("2024-03-01T08:00:00Z".parse().expect("valid timestamp"))
    );
    assert_eq!(
        documents[0].matched_data[3].matched_segment,
        MatchStatus::Matched(SegmentId::from("S2"))
    );
}
