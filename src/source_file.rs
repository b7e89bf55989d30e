//! Loading records from the `Performances.json` file that the
//! simulation writes into its results directory.

//! The file holds one JSON object, mapping each timestep name (the
//! decimal timestep, optionally zero-padded and with a leading `/`)
//! to an object of dataset name to array of per-process values:
//!
//! ```json
//! { "/0000000100": { "hindex": [0, 12], "timer_total": [1.5, 1.75] } }
//! ```
//!
//! Every timestep must carry a `hindex` dataset of non-negative
//! integers. The file may also be stored zstd-compressed as
//! `Performances.json.zstd`.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;
use ndarray::Array1;

use crate::{
    info,
    record::{Record, RecordSource, HINDEX},
    zstd_file::{candidate_paths, open_decompressed},
};

pub const PERFORMANCES_FILE_NAME: &str = "Performances.json";

type RawTimestep = BTreeMap<String, Vec<f64>>;

/// Parse a timestep name like `"/0000000100"` or `"100"`.
pub fn parse_timestep_name(name: &str) -> Result<u64> {
    let digits = name.strip_prefix('/').unwrap_or(name);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid timestep name {name:?}, expecting a decimal number");
    }
    digits
        .parse()
        .with_context(|| anyhow!("timestep name {name:?} out of range"))
}

fn hindex_from_values(values: &[f64]) -> Result<Vec<u64>> {
    values
        .iter()
        .enumerate()
        .map(|(rank, &v)| {
            if v >= 0. && v.fract() == 0. && v <= u64::MAX as f64 {
                Ok(v as u64)
            } else {
                bail!("{HINDEX} value {v} of process {rank} is not a non-negative integer")
            }
        })
        .collect()
}

fn record_from_raw(name: &str, mut datasets: RawTimestep) -> Result<Record> {
    let timestep = parse_timestep_name(name)?;
    let hindex = datasets
        .remove(HINDEX)
        .ok_or_else(|| anyhow!("timestep {name:?} is missing the {HINDEX:?} dataset"))?;
    let hindex =
        hindex_from_values(&hindex).with_context(|| anyhow!("in timestep {name:?}"))?;
    let quantities = datasets
        .into_iter()
        .map(|(k, v)| (KString::from_string(k), Array1::from_vec(v)))
        .collect();
    Ok(Record::new(timestep, quantities, hindex))
}

/// Parse the contents of a performances file.
pub fn records_from_str(s: &str) -> Result<Vec<Record>> {
    let raw: BTreeMap<String, RawTimestep> =
        serde_json::from_str(s).with_context(|| anyhow!("decoding performances JSON"))?;
    raw.into_iter()
        .map(|(name, datasets)| record_from_raw(&name, datasets))
        .collect()
}

/// A results directory containing a performances file, or the path
/// to the file itself.
#[derive(Debug, Clone)]
pub struct PerformancesFile {
    path: PathBuf,
}

impl PerformancesFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory the results are in.
    pub fn results_dir(&self) -> &Path {
        if self.path.is_dir() {
            &self.path
        } else {
            self.path.parent().unwrap_or(Path::new("."))
        }
    }

    /// The file to read, uncompressed preferred.
    pub fn resolve(&self) -> Result<PathBuf> {
        if self.path.is_dir() {
            let candidates = candidate_paths(&self.path, PERFORMANCES_FILE_NAME);
            candidates
                .iter()
                .find(|path| path.is_file())
                .cloned()
                .ok_or_else(|| anyhow!("could not open any of {candidates:?}"))
        } else {
            Ok(self.path.clone())
        }
    }
}

impl RecordSource for PerformancesFile {
    fn name(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    fn open(&self) -> Result<Vec<Record>> {
        let path = self.resolve()?;
        info!("loading performances from {path:?}");
        let mut input = open_decompressed(&path, "json")?;
        let mut s = String::new();
        input
            .read_to_string(&mut s)
            .with_context(|| anyhow!("reading file {path:?}"))?;
        let records = records_from_str(&s).with_context(|| anyhow!("in file {path:?}"))?;
        info!("{} timesteps in {path:?}", records.len());
        Ok(records)
    }
}
