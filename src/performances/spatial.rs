//! Memoized curve and ownership matrices for 2-D maps.

use std::sync::{Arc, OnceLock, RwLock};

use crate::{
    debug,
    hilbert::{GridShape, HilbertMatrix},
    info,
    partition::{PartitionError, RankMatrix},
};

/// Width of the unowned border around the grid.
pub const OVERSIZE: usize = 1;

#[derive(Debug)]
pub struct SpatialCache {
    shape: GridShape,
    hilbert: OnceLock<HilbertMatrix>,
    /// The matrix for the most recently requested boundaries
    ranks: RwLock<Option<(Vec<u64>, Arc<RankMatrix>)>>,
}

impl SpatialCache {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            hilbert: OnceLock::new(),
            ranks: RwLock::new(None),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn hilbert(&self) -> &HilbertMatrix {
        self.hilbert.get_or_init(|| {
            info!(
                "building Hilbert curve for {} x {} patches",
                self.shape.patches_x(),
                self.shape.patches_y()
            );
            HilbertMatrix::for_shape(self.shape, OVERSIZE)
        })
    }

    /// The owner of each patch for the given process boundaries.
    pub fn ranks(&self, boundaries: &[u64]) -> Result<Arc<RankMatrix>, PartitionError> {
        {
            let cached = self.ranks.read().unwrap_or_else(|e| e.into_inner());
            if let Some((cached_boundaries, ranks)) = &*cached {
                if cached_boundaries.as_slice() == boundaries {
                    return Ok(ranks.clone());
                }
            }
        }
        debug!("partitioning patches for {} processes", boundaries.len());
        let ranks = Arc::new(RankMatrix::partition(
            self.hilbert().indices(),
            boundaries,
            OVERSIZE,
        )?);
        let mut cached = self.ranks.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some((boundaries.to_vec(), ranks.clone()));
        Ok(ranks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_cache() {
        let cache = SpatialCache::new(GridShape::new(2, 2).unwrap());
        let a = cache.ranks(&[0, 5, 8, 13]).unwrap();
        let b = cache.ranks(&[0, 5, 8, 13]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.ranks(&[0, 8]).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.owner(1, 1), Some(0));
        assert!(std::ptr::eq(cache.hilbert(), cache.hilbert()));
        assert!(cache.ranks(&[]).is_err());
    }
}
