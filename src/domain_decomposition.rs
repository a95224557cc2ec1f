//! Domain decomposition for parallel FDTD updates
//!
//! The interior of the grid is split into contiguous slabs along x, one per
//! worker. A kernel hands each slab's mutable view to exactly one rayon task;
//! neighbouring values are read from the immutable source arrays, whose halos
//! were refreshed before the kernel started. Returning from a kernel is the
//! barrier between update phases.

use ndarray::{s, Array3, Axis};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A contiguous range of x planes owned by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slab {
    /// ID of this slab
    pub id: usize,
    /// First interior x index (1-based, halo at 0)
    pub start: usize,
    /// One past the last interior x index
    pub end: usize,
}

impl Slab {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Slab decomposition manager
#[derive(Debug, Clone)]
pub struct SlabDecomposition {
    /// Interior cells of the global grid
    pub cells: [usize; 3],
    /// Planes per slab (the last slab may be shorter)
    pub slab_len: usize,
    /// List of all slabs
    pub slabs: Vec<Slab>,
}

impl SlabDecomposition {
    /// Split `cells[0]` planes over at most `workers` slabs
    pub fn new(cells: [usize; 3], workers: usize) -> Self {
        let nx = cells[0].max(1);
        let workers = workers.clamp(1, nx);
        let slab_len = nx.div_ceil(workers);

        let slabs = (0..nx.div_ceil(slab_len))
            .map(|id| Slab {
                id,
                start: 1 + id * slab_len,
                end: 1 + ((id + 1) * slab_len).min(nx),
            })
            .collect();

        Self {
            cells,
            slab_len,
            slabs,
        }
    }

    /// Use one slab per thread of the current rayon pool
    pub fn for_current_pool(cells: [usize; 3]) -> Self {
        Self::new(cells, rayon::current_num_threads())
    }

    pub fn num_slabs(&self) -> usize {
        self.slabs.len()
    }

    /// Visit every interior entry of `dst` in parallel, slab by slab
    ///
    /// `f` receives the global array index of the entry (halo-based, so the
    /// first interior cell is `[1, 1, 1]`) and a mutable reference to it.
    pub fn for_each_interior<T, F>(&self, dst: &mut Array3<T>, f: F)
    where
        T: Send,
        F: Fn([usize; 3], &mut T) + Sync,
    {
        let [nx, ny, nz] = self.cells;
        let slab_len = self.slab_len;
        let mut interior = dst.slice_mut(s![1..nx + 1, 1..ny + 1, 1..nz + 1]);
        let chunks: Vec<_> = interior.axis_chunks_iter_mut(Axis(0), slab_len).collect();

        chunks
            .into_par_iter()
            .enumerate()
            .for_each(|(slab, mut chunk)| {
                let i0 = 1 + slab * slab_len;
                for ((di, j, k), value) in chunk.indexed_iter_mut() {
                    f([i0 + di, j + 1, k + 1], value);
                }
            });
    }

    /// Evaluate `f` on every interior x plane in parallel and concatenate the results
    pub fn collect_planes<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> Vec<R> + Sync + Send,
    {
        (1..=self.cells[0])
            .into_par_iter()
            .flat_map_iter(f)
            .collect()
    }
}

/// Cooperative cancellation flag, checked between time steps
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_creation() {
        let dd = SlabDecomposition::new([10, 4, 4], 3);
        assert_eq!(dd.slab_len, 4);
        assert_eq!(dd.num_slabs(), 3);
        assert_eq!(dd.slabs[0], Slab { id: 0, start: 1, end: 5 });
        assert_eq!(dd.slabs[2], Slab { id: 2, start: 9, end: 11 });
        let total: usize = dd.slabs.iter().map(Slab::len).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_more_workers_than_planes() {
        let dd = SlabDecomposition::new([2, 8, 8], 16);
        assert_eq!(dd.num_slabs(), 2);
        assert!(dd.slabs.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_for_each_interior_touches_interior_only() {
        let dd = SlabDecomposition::new([5, 3, 2], 2);
        let mut a = Array3::<usize>::zeros((7, 5, 4));
        dd.for_each_interior(&mut a, |[i, j, k], v| *v = 100 * i + 10 * j + k);

        assert_eq!(a[[1, 1, 1]], 111);
        assert_eq!(a[[5, 3, 2]], 532);
        assert_eq!(a[[0, 1, 1]], 0);
        assert_eq!(a[[6, 1, 1]], 0);
        assert_eq!(a[[3, 4, 1]], 0);
        let touched = a.iter().filter(|&&v| v != 0).count();
        assert_eq!(touched, 30);
    }

    #[test]
    fn test_collect_planes_order() {
        let dd = SlabDecomposition::new([4, 1, 1], 2);
        let planes = dd.collect_planes(|i| vec![i, i]);
        assert_eq!(planes, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
