pub mod error;
pub mod matching;
#[cfg(feature = "cli")]
pub mod pipeline;

pub use error::ConfigError;
pub use matching::MatchConfig;
#[cfg(feature = "cli")]
pub use pipeline::{PipelineConfig, SinkKind, SourceKind};
