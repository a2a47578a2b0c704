use roadmatch::config::{PipelineConfig, SinkKind, SourceKind};
use roadmatch::network::RoadNetwork;
use roadmatch::pipeline::{
    ChunkedSink, JsonArraySource, JsonLinesSink, JsonLinesSource, Pipeline, PipelineError, Sink,
    Source,
};
use roadmatch::util::retry::RetryPolicy;
use roadmatch::MapMatcher;

use clap::Parser;
use dotenv::dotenv;
use log::{debug, info, warn};

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

fn open_input(path: &str, policy: &RetryPolicy) -> Result<Box<dyn BufRead>, PipelineError> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = policy.run(path, || File::open(path))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &str, policy: &RetryPolicy) -> Result<Box<dyn Write>, PipelineError> {
    if path == "-" {
        return Ok(Box::new(io::stdout()));
    }

    let file = policy.run(path, || File::create(path))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn open_source(config: &PipelineConfig, policy: &RetryPolicy) -> Result<Box<dyn Source>, PipelineError> {
    let input = open_input(&config.input, policy)?;

    Ok(match config.source {
        SourceKind::JsonArray => Box::new(JsonArraySource::from_reader(input, config.max_redeliveries)?),
        SourceKind::JsonLines => Box::new(JsonLinesSource::new(input, config.max_redeliveries)),
    })
}

fn open_sink(config: &PipelineConfig, policy: &RetryPolicy) -> Result<Box<dyn Sink>, PipelineError> {
    let output = open_output(&config.output, policy)?;

    Ok(match config.sink {
        SinkKind::JsonLines => Box::new(JsonLinesSink::new(output)),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load `.env` file before the logger, as it may carry `RUST_LOG`
    let environment = dotenv();

    #[cfg(feature = "tracing")]
    roadmatch::util::trace::initialize_tracer();
    #[cfg(not(feature = "tracing"))]
    env_logger::init();

    match environment {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(err) => debug!("No .env file loaded: {err}"),
    }

    let config = PipelineConfig::parse();
    config.validate()?;

    let network = RoadNetwork::from_file(&config.network)?;
    let matcher = MapMatcher::new(&network, config.match_config()?)?;

    let policy = config.retry_policy();
    let source = open_source(&config, &policy)?;
    let sink = ChunkedSink::new(open_sink(&config, &policy)?, config.chunk_size);

    info!("Matching {} with the {} source", config.input, config.source);
    let summary = Pipeline::new(&matcher, source, sink)
        .with_flush_records(config.flush_records)
        .run()?;

    if summary.failed_writes > 0 {
        warn!("{} trace write(s) failed", summary.failed_writes);
    }

    info!(
        "Done. {} trace(s), {} matched and {} unmatched observation(s)",
        summary.traces, summary.matched, summary.unmatched
    );

    Ok(())
}
