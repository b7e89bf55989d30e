//! Options selecting what a performances diagnostic extracts.

use anyhow::{anyhow, Context, Result};

use crate::{histogram::Bins, performances::error::ConfigurationError, timesteps::TimestepSelection};

/// A histogram request: `nsteps` bins from `min` to `max` over the
/// values of `formula`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    pub formula: String,
    pub min: f64,
    pub max: f64,
    pub nsteps: usize,
}

impl HistogramSpec {
    /// From `[formula, min, max, nsteps]`, e.g. as given on the
    /// command line.
    pub fn from_strings<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        match args {
            [formula, min, max, nsteps] => {
                let float = |name: &str, s: &S| {
                    s.as_ref()
                        .trim()
                        .parse::<f64>()
                        .with_context(|| anyhow!("histogram {name} {:?}", s.as_ref()))
                };
                Ok(Self {
                    formula: formula.as_ref().into(),
                    min: float("min", min)?,
                    max: float("max", max)?,
                    nsteps: nsteps
                        .as_ref()
                        .trim()
                        .parse()
                        .with_context(|| anyhow!("histogram nsteps {:?}", nsteps.as_ref()))?,
                })
            }
            _ => Err(anyhow!(
                "histogram needs 4 values: formula, min, max, nsteps; got {}",
                args.len()
            )),
        }
    }
}

/// Exactly one of `raw`, `map` and `histogram` must be given; use
/// `check` to verify that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformancesOpts {
    /// Formula to extract per process
    pub raw: Option<String>,
    /// Formula to extract per patch, spread out over the simulation
    /// domain
    pub map: Option<String>,
    pub histogram: Option<HistogramSpec>,
    pub timesteps: TimestepSelection,
    /// Take the decimal logarithm of the values of the formula
    pub data_log: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeKind {
    Raw,
    Map,
    Histogram(Bins),
}

/// The extraction mode with its formula, as checked from
/// `PerformancesOpts`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub formula: String,
    pub kind: ModeKind,
}

impl PerformancesOpts {
    pub fn raw(formula: &str) -> Self {
        Self {
            raw: Some(formula.into()),
            ..Default::default()
        }
    }

    pub fn map(formula: &str) -> Self {
        Self {
            map: Some(formula.into()),
            ..Default::default()
        }
    }

    pub fn histogram(formula: &str, min: f64, max: f64, nsteps: usize) -> Self {
        Self {
            histogram: Some(HistogramSpec {
                formula: formula.into(),
                min,
                max,
                nsteps,
            }),
            ..Default::default()
        }
    }

    pub fn with_timesteps(self, timesteps: TimestepSelection) -> Self {
        Self { timesteps, ..self }
    }

    pub fn with_data_log(self, data_log: bool) -> Self {
        Self { data_log, ..self }
    }

    pub fn check(&self) -> Result<Mode, ConfigurationError> {
        let Self {
            raw,
            map,
            histogram,
            timesteps: _,
            data_log: _,
        } = self;
        match (raw, map, histogram) {
            (Some(formula), None, None) => Ok(Mode {
                formula: formula.clone(),
                kind: ModeKind::Raw,
            }),
            (None, Some(formula), None) => Ok(Mode {
                formula: formula.clone(),
                kind: ModeKind::Map,
            }),
            (None, None, Some(HistogramSpec { formula, min, max, nsteps })) => Ok(Mode {
                formula: formula.clone(),
                kind: ModeKind::Histogram(Bins::new(*min, *max, *nsteps)?),
            }),
            (None, None, None) => Err(ConfigurationError::NoMode),
            _ => Err(ConfigurationError::MultipleModes),
        }
    }
}

/// Command line options for the same (see `PerformancesOpts`).
#[derive(clap::Args, Debug)]
pub struct ExtractOpts {
    /// Extract the value of the formula for each process
    #[clap(long)]
    raw: Option<String>,

    /// Extract the value of the formula for each patch, laid out
    /// over the simulation domain (1-D or 2-D simulations only)
    #[clap(long)]
    map: Option<String>,

    /// Count the processes by the value of the formula, in `NSTEPS`
    /// bins from `MIN` to `MAX`
    #[clap(long, number_of_values = 4, value_names = &["FORMULA", "MIN", "MAX", "NSTEPS"])]
    histogram: Option<Vec<String>>,

    /// A timestep (the closest available one is used) or an
    /// inclusive range `FROM:TO`; default: all timesteps
    #[clap(long)]
    timesteps: Option<TimestepSelection>,

    /// Take the decimal logarithm of the values of the formula
    #[clap(long)]
    data_log: bool,
}

impl ExtractOpts {
    pub fn into_performances_opts(self) -> Result<PerformancesOpts> {
        let Self {
            raw,
            map,
            histogram,
            timesteps,
            data_log,
        } = self;
        Ok(PerformancesOpts {
            raw,
            map,
            histogram: histogram
                .map(|args| HistogramSpec::from_strings(&args))
                .transpose()?,
            timesteps: timesteps.unwrap_or_default(),
            data_log,
        })
    }
}
