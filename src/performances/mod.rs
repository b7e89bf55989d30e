//! The performances diagnostic: a formula over the recorded
//! quantities, extracted per timestep as raw per-process values, as a
//! map over the simulation domain, or as a histogram.

pub mod engine;
pub mod error;
pub mod options;
pub mod spatial;

pub use engine::{Extraction, LineSegment, Performances};
pub use error::{ConfigurationError, DiagnosticError, QueryError};
pub use options::{ExtractOpts, HistogramSpec, PerformancesOpts};
