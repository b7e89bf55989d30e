pub mod aggregator;
pub mod axes;
pub mod diagnostic;
pub mod expression;
pub mod hilbert;
pub mod histogram;
pub mod load_config_file;
pub mod partition;
pub mod performances;
pub mod quantity;
pub mod record;
pub mod simulation;
pub mod source_file;
pub mod terminal_table;
pub mod timesteps;
pub mod utillib;
pub mod zstd_file;

pub const PATCHPERF_VERSION: &str = env!("CARGO_PKG_VERSION");
