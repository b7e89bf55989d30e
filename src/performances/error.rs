use crate::{
    aggregator::AggregateError,
    expression::{CompileError, EvalError},
    hilbert::GridShapeError,
    histogram::BinsError,
    partition::PartitionError,
    simulation::MetadataError,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("choose only one of `raw`, `map` or `histogram`")]
    MultipleModes,
    #[error("must define `raw`, `map` or `histogram`")]
    NoMode,
    #[error("invalid histogram: {0}")]
    Histogram(#[from] BinsError),
    #[error("`map` needs the simulation metadata (number of patches, cells and cell length)")]
    MissingMetadata,
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Why a diagnostic could not be set up.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DiagnosticError {
    #[error("diagnostic not loaded: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("diagnostic not loaded: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("diagnostic not loaded: {0}")]
    Compile(#[from] CompileError),
    #[error("diagnostic not loaded: {0}")]
    GridShape(#[from] GridShapeError),
    #[error("diagnostic not loaded: `map` is not available in {0}-D")]
    UnsupportedDimensionality(usize),
    #[error("diagnostic not loaded: timesteps not found")]
    TimestepsNotFound,
}

/// Why a single timestep could not be extracted.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("timestep {0} not found in this diagnostic")]
    TimestepNotFound(u64),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("cannot take the logarithm of {value} (process {process})")]
    NonPositiveLogInput { process: usize, value: f64 },
    #[error("the formula gives {found} values for {expected} processes")]
    ShapeMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error("this diagnostic is not a 2-D map")]
    NotASpatialMap,
}
