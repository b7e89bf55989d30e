//! The geometry of the simulation that produced the records.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{info, load_config_file::load_json5_file};

/// File name looked for next to the performances file.
pub const SIMULATION_FILE_NAME: &str = "simulation.json5";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("invalid simulation metadata: no dimensions given")]
    NoDimensions,
    #[error(
        "invalid simulation metadata: `{field}` has {found} entries, but \
         `number_of_patches` has {expected}"
    )]
    LengthMismatch {
        field: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("invalid simulation metadata: no patches along axis {0}")]
    NoPatches(usize),
    #[error("invalid simulation metadata: cell length {length} along axis {axis} is not positive")]
    CellLength { axis: usize, length: f64 },
}

/// One entry per spatial dimension in each field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationMetadata {
    pub number_of_patches: Vec<u64>,
    pub number_of_cells: Vec<u64>,
    pub cell_length: Vec<f64>,
}

impl SimulationMetadata {
    pub fn ndim(&self) -> usize {
        self.number_of_patches.len()
    }

    pub fn check(&self) -> Result<(), MetadataError> {
        let expected = self.ndim();
        if expected == 0 {
            return Err(MetadataError::NoDimensions);
        }
        for (field, found) in [
            ("number_of_cells", self.number_of_cells.len()),
            ("cell_length", self.cell_length.len()),
        ] {
            if found != expected {
                return Err(MetadataError::LengthMismatch {
                    field,
                    found,
                    expected,
                });
            }
        }
        if let Some(axis) = self.number_of_patches.iter().position(|&n| n == 0) {
            return Err(MetadataError::NoPatches(axis));
        }
        if let Some((axis, &length)) = self
            .cell_length
            .iter()
            .enumerate()
            .find(|&(_, &l)| !(l > 0.))
        {
            return Err(MetadataError::CellLength { axis, length });
        }
        Ok(())
    }

    pub fn total_patches(&self) -> u64 {
        self.number_of_patches.iter().product()
    }

    /// Length of the simulated domain along `axis`.
    pub fn domain_length(&self, axis: usize) -> f64 {
        self.number_of_cells[axis] as f64 * self.cell_length[axis]
    }

    /// Length of one patch along `axis`.
    pub fn patch_length(&self, axis: usize) -> f64 {
        self.domain_length(axis) / self.number_of_patches[axis] as f64
    }

    /// Load from `path` if given, else from `simulation.json5` in the
    /// first of `search_dirs` that has one. The result is checked.
    pub fn load<D: AsRef<Path>>(path: Option<&Path>, search_dirs: &[D]) -> Result<Option<Self>> {
        let metadata: Option<Self> = load_json5_file(path, SIMULATION_FILE_NAME, search_dirs)?;
        if let Some(metadata) = &metadata {
            metadata.check()?;
            info!(
                "simulation has {:?} patches, {:?} cells",
                metadata.number_of_patches, metadata.number_of_cells
            );
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn metadata() -> SimulationMetadata {
        SimulationMetadata {
            number_of_patches: vec![4, 2],
            number_of_cells: vec![64, 32],
            cell_length: vec![0.5, 0.25],
        }
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "patchperf-simulation-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("can create temp dir");
        dir
    }

    #[test]
    fn t_geometry() {
        let m = metadata();
        assert_eq!(m.check(), Ok(()));
        assert_eq!(m.ndim(), 2);
        assert_eq!(m.total_patches(), 8);
        assert_abs_diff_eq!(m.domain_length(0), 32.);
        assert_abs_diff_eq!(m.patch_length(0), 8.);
        assert_abs_diff_eq!(m.patch_length(1), 4.);
    }

    #[test]
    fn t_check() {
        let mut m = metadata();
        m.cell_length.pop();
        assert_eq!(
            m.check(),
            Err(MetadataError::LengthMismatch {
                field: "cell_length",
                found: 1,
                expected: 2
            })
        );
        let mut m = metadata();
        m.number_of_patches[1] = 0;
        assert_eq!(m.check(), Err(MetadataError::NoPatches(1)));
        let mut m = metadata();
        m.cell_length[0] = f64::NAN;
        assert!(matches!(m.check(), Err(MetadataError::CellLength { axis: 0, .. })));
        let m = SimulationMetadata {
            number_of_patches: vec![],
            number_of_cells: vec![],
            cell_length: vec![],
        };
        assert_eq!(m.check(), Err(MetadataError::NoDimensions));
    }

    #[test]
    fn t_load() -> Result<()> {
        let dir = test_dir("load");
        std::fs::write(
            dir.join(SIMULATION_FILE_NAME),
            "{ number_of_patches: [4, 2], number_of_cells: [64, 32], \
             cell_length: [0.5, 0.25], // trailing comma allowed\n }",
        )?;
        let loaded = SimulationMetadata::load(None, &[&dir])?;
        assert_eq!(loaded, Some(metadata()));

        let empty = test_dir("load-none");
        assert_eq!(SimulationMetadata::load(None, &[&empty])?, None);
        assert!(SimulationMetadata::load(Some(empty.join("missing.json5").as_path()), &[&dir]).is_err());

        std::fs::write(
            empty.join("bad.json5"),
            "{ number_of_patches: [4], number_of_cells: [64], cell_length: [1], foo: 1 }",
        )?;
        assert!(SimulationMetadata::load(Some(empty.join("bad.json5").as_path()), &[&dir]).is_err());

        std::fs::remove_dir_all(&dir)?;
        std::fs::remove_dir_all(&empty)?;
        Ok(())
    }
}
