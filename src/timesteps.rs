//! Restricting a diagnostic to some of the available timesteps.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestepSelection {
    #[default]
    All,
    /// The available timestep closest to the given one
    Nearest(u64),
    /// All available timesteps in the inclusive range
    Range(u64, u64),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("timesteps must be given as one or two non-negative integers, got {0:?}")]
pub struct InvalidTimestepSelection(pub Vec<i64>);

impl TimestepSelection {
    pub fn from_values(values: &[i64]) -> Result<Self, InvalidTimestepSelection> {
        let invalid = || InvalidTimestepSelection(values.to_vec());
        let nonneg = |v: i64| u64::try_from(v).map_err(|_| invalid());
        match *values {
            [] => Ok(TimestepSelection::All),
            [t] => Ok(TimestepSelection::Nearest(nonneg(t)?)),
            [a, b] => {
                let (a, b) = (nonneg(a)?, nonneg(b)?);
                Ok(TimestepSelection::Range(a.min(b), a.max(b)))
            }
            _ => Err(invalid()),
        }
    }

    /// Select from `available`, which must be sorted; duplicates
    /// are only returned once.
    pub fn select(self, available: &[u64]) -> Vec<u64> {
        let mut selected: Vec<u64> = match self {
            TimestepSelection::All => available.to_vec(),
            TimestepSelection::Nearest(t) => available
                .iter()
                .copied()
                .min_by_key(|a| a.abs_diff(t))
                .into_iter()
                .collect(),
            TimestepSelection::Range(from, to) => available
                .iter()
                .copied()
                .filter(|a| (from..=to).contains(a))
                .collect(),
        };
        selected.dedup();
        selected
    }
}

/// `"100"` or `"100:200"`.
impl FromStr for TimestepSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(':')
            .map(|part| {
                part.trim()
                    .parse::<i64>()
                    .with_context(|| anyhow!("invalid timestep {part:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        if values.len() > 2 {
            bail!("expecting a timestep or a range `from:to`, got {s:?}");
        }
        Ok(Self::from_values(&values)?)
    }
}
