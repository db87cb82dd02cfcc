//! Worker pool for read-only candidate searches
//!
//! Splits an index range into fixed-size blocks and runs one task per block
//! on Rayon, returning per-block results in block order.

use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;

use crate::error::CleanupError;

/// Default number of items per submitted block
pub const DEFAULT_BLOCK_SIZE: usize = 256;

#[derive(Clone)]
pub struct WorkerPool {
    block_size: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl WorkerPool {
    /// Pool running on Rayon's global thread pool
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            pool: None,
        }
    }

    /// Pool with its own dedicated threads
    pub fn with_threads(block_size: usize, threads: usize) -> Result<Self, CleanupError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cleanup-worker-{}", i))
            .build()?;
        Ok(Self {
            block_size: block_size.max(1),
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Run `task` over `0..len` in blocks. Blocks until every block is done;
    /// results come back in block order.
    pub fn submit_blocks<R, F>(&self, len: usize, task: F) -> Vec<Vec<R>>
    where
        R: Send,
        F: Fn(Range<usize>) -> Vec<R> + Sync,
    {
        let ranges: Vec<Range<usize>> = (0..len)
            .step_by(self.block_size)
            .map(|start| start..(start + self.block_size).min(len))
            .collect();

        let run = || ranges.into_par_iter().map(|range| task(range)).collect();

        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_cover_range_in_order() {
        let pool = WorkerPool::new(3);
        let blocks = pool.submit_blocks(10, |range| range.collect::<Vec<usize>>());
        assert_eq!(blocks.len(), 4);
        let flat: Vec<usize> = blocks.into_iter().flatten().collect();
        assert_eq!(flat, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_range_submits_nothing() {
        let pool = WorkerPool::new(8);
        let blocks: Vec<Vec<u8>> = pool.submit_blocks(0, |_| vec![1]);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_dedicated_threads() {
        let pool = WorkerPool::with_threads(2, 2).unwrap();
        let blocks = pool.submit_blocks(5, |range| vec![range.len()]);
        assert_eq!(blocks, vec![vec![2], vec![2], vec![1]]);
    }
}
