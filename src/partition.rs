//! Which process owns which patch: the `hindex` boundary array of a
//! record applied to the linear (1-D) or Hilbert (2-D) patch order.

use ndarray::{s, Array2, ArrayView2, Zip};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("invalid partition: no process boundaries given")]
    Empty,
    #[error(
        "invalid partition: boundaries must be non-decreasing, but process {rank} \
         starts at {value} while its predecessor starts at {previous}"
    )]
    Decreasing { rank: usize, value: u64, previous: u64 },
    #[error("invalid partition: {0} processes do not fit 32-bit ranks")]
    TooManyProcesses(usize),
}

fn check_boundaries(boundaries: &[u64]) -> Result<(), PartitionError> {
    if boundaries.is_empty() {
        return Err(PartitionError::Empty);
    }
    if u32::try_from(boundaries.len()).is_err() {
        return Err(PartitionError::TooManyProcesses(boundaries.len()));
    }
    for (i, pair) in boundaries.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(PartitionError::Decreasing {
                rank: i + 1,
                value: pair[1],
                previous: pair[0],
            });
        }
    }
    Ok(())
}

/// The owner of every patch `0..n_patches` in linear order; `None`
/// for patches before the first boundary.
pub fn ranks_1d(boundaries: &[u64], n_patches: usize) -> Result<Vec<Option<u32>>, PartitionError> {
    check_boundaries(boundaries)?;
    Ok((0..n_patches as u64)
        .map(|patch| {
            let owners = boundaries.partition_point(|&b| b <= patch);
            owners.checked_sub(1).map(|rank| rank as u32)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Constant x, i.e. between two columns
    Vertical,
    /// Constant y, i.e. between two rows
    Horizontal,
}

/// A piece of the outline between patches of different owners, in
/// patch units of the inner grid: `at` is the x (vertical) or y
/// (horizontal) position of the line, `from..to` its extent along
/// the other axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub orientation: Orientation,
    pub at: usize,
    pub from: usize,
    pub to: usize,
}

/// Owning rank per cell of a curve index matrix (same shape,
/// including its border). Border cells, and cells whose index lies
/// before the first boundary, have no owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankMatrix {
    oversize: usize,
    ranks: Array2<Option<u32>>,
}

impl RankMatrix {
    /// Every cell with an index `>= boundaries[r]` is given rank `r`,
    /// going through the boundaries in order, so that the last
    /// boundary not exceeding the index wins.
    pub fn partition(
        indices: ArrayView2<'_, u32>,
        boundaries: &[u64],
        oversize: usize,
    ) -> Result<Self, PartitionError> {
        check_boundaries(boundaries)?;
        let mut ranks = Array2::<Option<u32>>::from_elem(indices.dim(), None);
        for (rank, &boundary) in boundaries.iter().enumerate() {
            let rank = rank as u32;
            Zip::from(&mut ranks)
                .and(&indices)
                .for_each(|owner, &index| {
                    if u64::from(index) >= boundary {
                        *owner = Some(rank);
                    }
                });
        }

        if oversize > 0 {
            let (rows, cols) = ranks.dim();
            let o_rows = oversize.min(rows);
            let o_cols = oversize.min(cols);
            ranks.slice_mut(s![..o_rows, ..]).fill(None);
            ranks.slice_mut(s![rows - o_rows.., ..]).fill(None);
            ranks.slice_mut(s![.., ..o_cols]).fill(None);
            ranks.slice_mut(s![.., cols - o_cols..]).fill(None);
        }

        Ok(Self { oversize, ranks })
    }

    pub fn oversize(&self) -> usize {
        self.oversize
    }

    /// Including the border.
    pub fn ranks(&self) -> ArrayView2<'_, Option<u32>> {
        self.ranks.view()
    }

    pub fn owner(&self, row: usize, col: usize) -> Option<u32> {
        self.ranks.get((row, col)).copied().flatten()
    }

    /// Without the border, rows along y and columns along x.
    pub fn inner(&self) -> ArrayView2<'_, Option<u32>> {
        let o = self.oversize;
        let (rows, cols) = self.ranks.dim();
        self.ranks
            .slice(s![o..rows.saturating_sub(o).max(o), o..cols.saturating_sub(o).max(o)])
    }

    /// The outline of every process' region. The border counts as a
    /// region of its own, so the edges of the domain are part of the
    /// outline.
    pub fn boundary_segments(&self) -> Vec<Segment> {
        let (rows, cols) = self.ranks.dim();
        let o = self.oversize;
        let mut segments = Vec::new();

        // Runs of consecutive `true` in `differs`, as half-open ranges
        // of positions.
        fn runs(differs: impl Iterator<Item = bool>) -> Vec<(usize, usize)> {
            let mut out = Vec::new();
            let mut start = None;
            let mut len = 0;
            for (i, d) in differs.enumerate() {
                match (d, start) {
                    (true, None) => start = Some(i),
                    (false, Some(s)) => {
                        out.push((s, i));
                        start = None;
                    }
                    _ => (),
                }
                len = i + 1;
            }
            if let Some(s) = start {
                out.push((s, len));
            }
            out
        }

        for col in 0..cols.saturating_sub(1) {
            let differs = (0..rows).map(|row| self.ranks[[row, col]] != self.ranks[[row, col + 1]]);
            for (from, to) in runs(differs) {
                segments.push(Segment {
                    orientation: Orientation::Vertical,
                    at: (col + 1).saturating_sub(o),
                    from: from.saturating_sub(o),
                    to: to.saturating_sub(o),
                });
            }
        }
        for row in 0..rows.saturating_sub(1) {
            let differs = (0..cols).map(|col| self.ranks[[row, col]] != self.ranks[[row + 1, col]]);
            for (from, to) in runs(differs) {
                segments.push(Segment {
                    orientation: Orientation::Horizontal,
                    at: (row + 1).saturating_sub(o),
                    from: from.saturating_sub(o),
                    to: to.saturating_sub(o),
                });
            }
        }
        segments
    }
}
