//! Matrices of Hilbert-curve indices: for every cell of a 2-D patch
//! grid, the position of that patch along the (possibly tiled)
//! Hilbert curve that the simulation uses to hand out patches to
//! processes.

//! Rows of the matrix run along axis 1 (y), columns along axis 0
//! (x). A border of `oversize` cells is kept around the grid; its
//! contents are zero and carry no meaning.

use ndarray::{s, Array2, ArrayView2};

/// Curve indices are stored as `u32`, thus the total number of
/// patches must stay below 2^32.
const MAX_TOTAL_EXPONENT: u32 = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridShapeError {
    #[error(
        "invalid grid shape: {patches} patches along axis {axis} is not a \
         (non-zero) power of two"
    )]
    NotPowerOfTwo { axis: usize, patches: u64 },
    #[error("invalid grid shape: 2^{m1} x 2^{m2} patches do not fit 32-bit curve indices")]
    TooLarge { m1: u32, m2: u32 },
}

/// The log2 of the number of patches along both axes. Only
/// constructible for shapes whose curve indices fit `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    m1: u32,
    m2: u32,
}

impl GridShape {
    pub fn new(m1: u32, m2: u32) -> Result<Self, GridShapeError> {
        match m1.checked_add(m2) {
            Some(total) if total <= MAX_TOTAL_EXPONENT => Ok(Self { m1, m2 }),
            _ => Err(GridShapeError::TooLarge { m1, m2 }),
        }
    }

    /// From the number of patches along x and y, which must be exact
    /// powers of two.
    pub fn from_patches(patches_x: u64, patches_y: u64) -> Result<Self, GridShapeError> {
        let exponent = |axis: usize, patches: u64| {
            if patches.is_power_of_two() {
                Ok(patches.trailing_zeros())
            } else {
                Err(GridShapeError::NotPowerOfTwo { axis, patches })
            }
        };
        Self::new(exponent(0, patches_x)?, exponent(1, patches_y)?)
    }

    pub fn m1(self) -> u32 {
        self.m1
    }

    pub fn m2(self) -> u32 {
        self.m2
    }

    pub fn patches_x(self) -> usize {
        1 << self.m1
    }

    pub fn patches_y(self) -> usize {
        1 << self.m2
    }

    pub fn total_patches(self) -> u64 {
        1 << (self.m1 + self.m2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HilbertMatrix {
    shape: GridShape,
    oversize: usize,
    indices: Array2<u32>,
}

impl HilbertMatrix {
    /// `m1`, `m2`: log2 of the number of patches along x and y.
    pub fn build(m1: u32, m2: u32, oversize: usize) -> Result<Self, GridShapeError> {
        Ok(Self::for_shape(GridShape::new(m1, m2)?, oversize))
    }

    /// From the number of patches along x and y.
    pub fn for_patches(
        patches_x: u64,
        patches_y: u64,
        oversize: usize,
    ) -> Result<Self, GridShapeError> {
        Ok(Self::for_shape(
            GridShape::from_patches(patches_x, patches_y)?,
            oversize,
        ))
    }

    pub fn for_shape(shape: GridShape, oversize: usize) -> Self {
        let GridShape { m1, m2 } = shape;
        let o = oversize;
        let m = m1.min(m2);
        let mut a = Array2::<u32>::zeros((shape.patches_y() + 2 * o, shape.patches_x() + 2 * o));

        // Side length and cell count of the square block built so
        // far, starting with the single-cell curve (index 0).
        let mut side: usize = 1;
        let mut block_cells: u64 = 1;

        for i in 0..m {
            let half = 1usize << i;
            side = 2 * half;
            let quadrant_cells = block_cells;
            block_cells *= 4;
            let k1 = half + o;
            let k2 = side + o;

            let second_quadrant = a
                .slice(s![o..k1, o..k1])
                .t()
                .mapv(|v| v + quadrant_cells as u32);
            a.slice_mut(s![o..k1, k1..k2]).assign(&second_quadrant);

            // Bottom half mirrors the top half, walked in reverse.
            let last = (block_cells - 1) as u32;
            let second_half = a.slice(s![o..k1;-1, o..k2]).mapv(|v| last - v);
            a.slice_mut(s![k1..k2, o..k2]).assign(&second_half);

            let transposed = a.slice(s![o..k2, o..k2]).t().to_owned();
            a.slice_mut(s![o..k2, o..k2]).assign(&transposed);
        }

        let k2 = side + o;
        let tiles = 1usize << m1.abs_diff(m2);
        if m2 > m1 {
            let transposed = a.slice(s![o..k2, o..k2]).t().to_owned();
            a.slice_mut(s![o..k2, o..k2]).assign(&transposed);
            let block = a.slice(s![o..k2, o..k2]).to_owned();
            for j in 1..tiles {
                let offset = (j as u64 * block_cells) as u32;
                a.slice_mut(s![(j * side + o)..((j + 1) * side + o), o..k2])
                    .assign(&block.mapv(|v| v + offset));
            }
        } else if m1 > m2 {
            let block = a.slice(s![o..k2, o..k2]).to_owned();
            for j in 1..tiles {
                let offset = (j as u64 * block_cells) as u32;
                a.slice_mut(s![o..k2, (j * side + o)..((j + 1) * side + o)])
                    .assign(&block.mapv(|v| v + offset));
            }
        }

        Self {
            shape,
            oversize,
            indices: a,
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn oversize(&self) -> usize {
        self.oversize
    }

    /// The full matrix, including the border.
    pub fn indices(&self) -> ArrayView2<'_, u32> {
        self.indices.view()
    }

    /// Without the border.
    pub fn inner(&self) -> ArrayView2<'_, u32> {
        let o = self.oversize;
        let (rows, cols) = self.indices.dim();
        self.indices.slice(s![o..rows - o, o..cols - o])
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use ndarray::array;

    use super::*;

    fn h(m1: u32, m2: u32) -> Array2<u32> {
        HilbertMatrix::build(m1, m2, 0).unwrap().indices().to_owned()
    }

    #[test]
    fn t_small_curves() {
        assert_eq!(h(0, 0), array![[0]]);
        assert_eq!(h(1, 1), array![[0, 3], [1, 2]]);
        assert_eq!(
            h(2, 2),
            array![
                [0, 1, 14, 15],
                [3, 2, 13, 12],
                [4, 7, 8, 11],
                [5, 6, 9, 10]
            ]
        );
        assert_eq!(
            h(3, 3).row(0).to_vec(),
            vec![0, 3, 4, 5, 58, 59, 60, 63]
        );
    }

    #[test]
    fn t_tiled_curves() {
        assert_eq!(h(2, 1), array![[0, 3, 4, 7], [1, 2, 5, 6]]);
        assert_eq!(h(1, 2), array![[0, 1], [3, 2], [4, 5], [7, 6]]);
        assert_eq!(h(2, 0), array![[0, 1, 2, 3]]);
        assert_eq!(h(0, 2), array![[0], [1], [2], [3]]);
        assert_eq!(
            h(3, 1),
            array![
                [0, 3, 4, 7, 8, 11, 12, 15],
                [1, 2, 5, 6, 9, 10, 13, 14]
            ]
        );
    }

    #[test]
    fn t_permutation() {
        for (m1, m2, oversize) in [(0, 0, 0), (1, 1, 1), (3, 3, 0), (4, 2, 1), (1, 4, 2), (5, 5, 1)] {
            let matrix = HilbertMatrix::build(m1, m2, oversize).unwrap();
            let inner = matrix.inner();
            assert_eq!(inner.dim(), (1 << m2, 1 << m1));
            let sorted = inner.iter().copied().sorted().collect::<Vec<u32>>();
            let expected = (0..(1u32 << (m1 + m2))).collect::<Vec<u32>>();
            assert_eq!(sorted, expected, "m1={m1} m2={m2} oversize={oversize}");
        }
    }

    #[test]
    fn t_curve_is_continuous() {
        for (m1, m2) in [(1, 1), (3, 3), (4, 4), (3, 1), (1, 3), (2, 4), (5, 2)] {
            let matrix = HilbertMatrix::build(m1, m2, 0).unwrap();
            let mut position = vec![(0usize, 0usize); 1 << (m1 + m2)];
            for ((row, col), &v) in matrix.indices().indexed_iter() {
                position[v as usize] = (row, col);
            }
            for ((r0, c0), (r1, c1)) in position.iter().tuple_windows() {
                assert_eq!(
                    r0.abs_diff(*r1) + c0.abs_diff(*c1),
                    1,
                    "m1={m1} m2={m2}: jump between {:?} and {:?}",
                    (r0, c0),
                    (r1, c1)
                );
            }
        }
    }

    #[test]
    fn t_deterministic() {
        let a = HilbertMatrix::build(4, 3, 1).unwrap();
        let b = HilbertMatrix::build(4, 3, 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn t_oversize_border() {
        let m = HilbertMatrix::build(1, 1, 1).unwrap();
        assert_eq!(m.indices().dim(), (4, 4));
        assert_eq!(m.inner(), array![[0, 3], [1, 2]]);
    }

    #[test]
    fn t_grid_shape() {
        assert_eq!(
            GridShape::from_patches(8, 4),
            GridShape::new(3, 2)
        );
        assert_eq!(
            GridShape::from_patches(6, 4),
            Err(GridShapeError::NotPowerOfTwo {
                axis: 0,
                patches: 6
            })
        );
        assert_eq!(
            GridShape::from_patches(4, 0),
            Err(GridShapeError::NotPowerOfTwo {
                axis: 1,
                patches: 0
            })
        );
        assert_eq!(
            GridShape::new(20, 13),
            Err(GridShapeError::TooLarge { m1: 20, m2: 13 })
        );
        let shape = GridShape::new(16, 16).unwrap();
        assert_eq!(shape.total_patches(), 1 << 32);

        assert_eq!(
            HilbertMatrix::for_patches(4, 2, 0).unwrap().indices(),
            h(2, 1)
        );
        assert!(HilbertMatrix::for_patches(3, 2, 0).is_err());
    }
}
