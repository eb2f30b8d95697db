use clausemap_parser::ParseError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::population::PopulationError;

/// Hard failures of the pipeline. Everything else degrades into
/// [`crate::CoordinationStatus`] and [`crate::Diagnostic`] values.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse failure: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Population(#[from] PopulationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorInitError {
    #[error("detector '{name}' failed to initialize: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("order table snapshot could not be written: {0}")]
    Write(String),

    #[error("order table snapshot is corrupt: {0}")]
    Corrupt(String),
}
