use crate::config::ConfigError;
use crate::impl_err;
use crate::network::LoadError;
use crate::pipeline::PipelineError;
use crate::transition::MatchError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Load(LoadError),

    #[error(transparent)]
    Match(MatchError),

    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Pipeline(PipelineError),
}

impl_err!(LoadError, Load);
impl_err!(MatchError, Match);
impl_err!(ConfigError, Config);
impl_err!(PipelineError, Pipeline);
