use crate::config::{ConfigError, MatchConfig};
use crate::pipeline::{DEFAULT_CHUNK_SIZE, DEFAULT_FLUSH_RECORDS};
use crate::util::retry::{RetryPolicy, DEFAULT_ATTEMPTS};

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};

/// Where observations are read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SourceKind {
    /// A single JSON array of observations.
    JsonArray,

    /// One JSON observation per line.
    JsonLines,
}

/// Where result documents are written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SinkKind {
    /// One JSON result document per line.
    JsonLines,
}

/// Matches GPS observations onto a road network.
///
/// Every flag may also be given through its `ROADMATCH_*` environment
/// variable, or a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "roadmatch", version, about)]
pub struct PipelineConfig {
    /// The road network, as an `edges.json` document
    #[arg(long, env = "ROADMATCH_NETWORK")]
    pub network: PathBuf,

    /// The observations to match, or `-` for standard input
    #[arg(long, env = "ROADMATCH_INPUT", default_value = "-")]
    pub input: String,

    /// The layout of the observations
    #[arg(long, env = "ROADMATCH_SOURCE", default_value_t = SourceKind::JsonLines)]
    pub source: SourceKind,

    /// Where to write results, or `-` for standard output
    #[arg(long, env = "ROADMATCH_OUTPUT", default_value = "-")]
    pub output: String,

    /// The layout of the results
    #[arg(long, env = "ROADMATCH_SINK", default_value_t = SinkKind::JsonLines)]
    pub sink: SinkKind,

    /// Engine parameters as a JSON document. When given, the engine
    /// flags below are ignored
    #[arg(long, env = "ROADMATCH_MATCH_CONFIG")]
    pub match_config: Option<PathBuf>,

    #[arg(long, env = "ROADMATCH_SEARCH_RADIUS_METERS", default_value_t = 50.0)]
    pub search_radius_meters: f64,

    #[arg(long, env = "ROADMATCH_GPS_SIGMA_METERS", default_value_t = 10.0)]
    pub gps_sigma_meters: f64,

    #[arg(long, env = "ROADMATCH_TRANSITION_DECAY_CONSTANT", default_value_t = 5.0)]
    pub transition_decay_constant: f64,

    #[arg(long, env = "ROADMATCH_BEAM_WIDTH", default_value_t = 5)]
    pub beam_width: usize,

    #[arg(long, env = "ROADMATCH_ROUTE_BOUND_FACTOR", default_value_t = 4.0)]
    pub route_bound_factor: f64,

    #[arg(long, env = "ROADMATCH_MIN_ROUTE_BOUND_METERS", default_value_t = 2000.0)]
    pub min_route_bound_meters: f64,

    /// Records per written part of a result document
    #[arg(long, env = "ROADMATCH_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Settled points of a trace which are written and acknowledged together
    #[arg(long, env = "ROADMATCH_FLUSH_RECORDS", default_value_t = DEFAULT_FLUSH_RECORDS)]
    pub flush_records: usize,

    /// Times a delivery is redelivered after a failed write before it is dropped
    #[arg(long, env = "ROADMATCH_MAX_REDELIVERIES", default_value_t = 3)]
    pub max_redeliveries: usize,

    /// Attempts made to open the input and output
    #[arg(long, env = "ROADMATCH_CONNECT_ATTEMPTS", default_value_t = DEFAULT_ATTEMPTS)]
    pub connect_attempts: usize,

    /// Seconds between attempts to open the input and output
    #[arg(long, env = "ROADMATCH_CONNECT_DELAY_SECONDS", default_value_t = 20)]
    pub connect_delay_seconds: u64,
}

impl PipelineConfig {
    /// The engine parameters, read from [`match_config`](#structfield.match_config)
    /// when present and otherwise from the flags.
    pub fn match_config(&self) -> Result<MatchConfig, ConfigError> {
        let config = match &self.match_config {
            Some(path) => MatchConfig::from_file(path)?,
            None => MatchConfig {
                search_radius_meters: self.search_radius_meters,
                gps_sigma_meters: self.gps_sigma_meters,
                transition_decay_constant: self.transition_decay_constant,
                beam_width: self.beam_width,
                route_bound_factor: self.route_bound_factor,
                min_route_bound_meters: self.min_route_bound_meters,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_secs(self.connect_delay_seconds),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }

        if self.flush_records == 0 {
            return Err(ConfigError::ZeroFlushRecords);
        }

        self.match_config().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_the_engine_configuration() {
        let config = PipelineConfig::try_parse_from([
            "roadmatch",
            "--network",
            "edges.json",
            "--source",
            "json-array",
            "--beam-width",
            "3",
        ])
        .expect("must parse");

        assert_eq!(config.source, SourceKind::JsonArray);
        assert_eq!(config.sink, SinkKind::JsonLines);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.flush_records, DEFAULT_FLUSH_RECORDS);

        let engine = config.match_config().expect("must be valid");
        assert_eq!(engine.beam_width, 3);
        assert_eq!(engine.search_radius_meters, 50.0);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let config = PipelineConfig::try_parse_from([
            "roadmatch",
            "--network",
            "edges.json",
            "--chunk-size",
            "0",
        ])
        .expect("must parse");

        assert!(matches!(config.validate(), Err(ConfigError::ZeroChunkSize)));
    }

    #[test]
    fn rejects_zero_flush_records() {
        let config = PipelineConfig::try_parse_from([
            "roadmatch",
            "--network",
            "edges.json",
            "--flush-records",
            "0",
        ])
        .expect("must parse");

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroFlushRecords)
        ));
    }
}
