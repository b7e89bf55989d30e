//! Equal-width histograms of per-process values.

use ndarray::{Array1, ArrayView1};

use crate::axes::linspace;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BinsError {
    #[error("histogram bounds must be finite, got min = {min}, max = {max}")]
    NotFinite { min: f64, max: f64 },
    #[error("histogram min ({min}) must be smaller than max ({max})")]
    EmptyRange { min: f64, max: f64 },
    #[error("histogram needs at least one bin")]
    NoBins,
}

/// `nsteps` equal-width bins from `min` to `max`. All bins are
/// half-open except the last one, which includes `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    edges: Array1<f64>,
}

impl Bins {
    pub fn new(min: f64, max: f64, nsteps: usize) -> Result<Self, BinsError> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(BinsError::NotFinite { min, max });
        }
        if !(min < max) {
            return Err(BinsError::EmptyRange { min, max });
        }
        if nsteps == 0 {
            return Err(BinsError::NoBins);
        }
        Ok(Self {
            edges: linspace(min, max, nsteps + 1),
        })
    }

    pub fn nsteps(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.nsteps()]
    }

    /// `nsteps + 1` values.
    pub fn edges(&self) -> ArrayView1<'_, f64> {
        self.edges.view()
    }

    pub fn centers(&self) -> Array1<f64> {
        let half = (self.max() - self.min()) / self.nsteps() as f64 * 0.5;
        self.edges
            .slice(ndarray::s![..-1])
            .mapv(|edge| edge + half)
    }

    /// The bin `value` falls into; None if outside (or NaN).
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        let n = self.nsteps();
        if !(value >= self.min() && value <= self.max()) {
            return None;
        }
        if value == self.max() {
            return Some(n - 1);
        }
        let edges = self.edges.as_slice().expect("owned 1-D array is contiguous");
        // Index of the first edge above `value`, minus one
        Some(edges.partition_point(|&edge| edge <= value) - 1)
    }

    /// Number of values in each bin; values outside the range, and
    /// NaN, are not counted.
    pub fn count(&self, values: ArrayView1<'_, f64>) -> Array1<u64> {
        let mut counts = Array1::<u64>::zeros(self.nsteps());
        for &value in values {
            if let Some(bin) = self.bin_of(value) {
                counts[bin] += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn t_count() {
        let bins = Bins::new(0., 10., 5).unwrap();
        assert_eq!(bins.count(array![1., 1., 6., 9.].view()), array![2, 0, 0, 1, 1]);
        // Edges go to the upper bin, except for max
        assert_eq!(bins.count(array![0., 2., 10.].view()), array![1, 1, 0, 0, 1]);
        assert_eq!(
            bins.count(array![-0.1, 10.1, f64::NAN, f64::INFINITY].view()),
            array![0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn t_centers() {
        let bins = Bins::new(0., 10., 5).unwrap();
        assert_abs_diff_eq!(bins.centers(), array![1., 3., 5., 7., 9.]);
        assert_eq!(bins.edges().len(), 6);
    }

    #[test]
    fn t_invalid() {
        assert_eq!(
            Bins::new(1., 1., 3),
            Err(BinsError::EmptyRange { min: 1., max: 1. })
        );
        assert_eq!(Bins::new(0., 1., 0), Err(BinsError::NoBins));
        assert!(matches!(
            Bins::new(0., f64::INFINITY, 2),
            Err(BinsError::NotFinite { .. })
        ));
        assert!(Bins::new(f64::NAN, 1., 2).is_err());
    }
}
