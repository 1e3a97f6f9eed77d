//! Parallel dispatch of per-image jobs.
//!
//! Jobs run on a bounded rayon pool. Every job owns its input and output
//! files (output names are derived from input names), so no locking is
//! needed between them. Results come back in input order whatever the
//! completion order was.

use std::path::{Path, PathBuf};
use std::thread;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::DispatchError;

/// Pool size used when the host parallelism cannot be queried.
pub const FALLBACK_POOL_SIZE: usize = 4;

/// Number of workers matching the host's available parallelism.
pub fn default_pool_size() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_POOL_SIZE)
}

// =============================================================================
// WorkerPool
// =============================================================================

/// A fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Build a pool of exactly `size` workers.
    pub fn new(size: usize) -> Result<Self, DispatchError> {
        if size == 0 {
            return Err(DispatchError::EmptyPool);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|index| format!("matrixscan-worker-{}", index))
            .build()?;
        debug!("Started worker pool with {} threads", size);
        Ok(WorkerPool { pool, size })
    }

    /// Build a pool sized by [`default_pool_size`].
    pub fn with_default_size() -> Result<Self, DispatchError> {
        Self::new(default_pool_size())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `f` on every job and collect the results in input order.
    pub fn map<T, R, F>(&self, jobs: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        self.pool.install(|| jobs.into_par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

// =============================================================================
// Batch
// =============================================================================

/// Images handed to a batch operation: a single path or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl Batch {
    pub fn into_vec(self) -> Vec<PathBuf> {
        match self {
            Batch::One(path) => vec![path],
            Batch::Many(paths) => paths,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::One(_) => 1,
            Batch::Many(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<PathBuf> for Batch {
    fn from(path: PathBuf) -> Self {
        Batch::One(path)
    }
}

impl From<&Path> for Batch {
    fn from(path: &Path) -> Self {
        Batch::One(path.to_path_buf())
    }
}

impl From<&PathBuf> for Batch {
    fn from(path: &PathBuf) -> Self {
        Batch::One(path.clone())
    }
}

impl From<&str> for Batch {
    fn from(path: &str) -> Self {
        Batch::One(PathBuf::from(path))
    }
}

impl From<Vec<PathBuf>> for Batch {
    fn from(paths: Vec<PathBuf>) -> Self {
        Batch::Many(paths)
    }
}

impl From<&[PathBuf]> for Batch {
    fn from(paths: &[PathBuf]) -> Self {
        Batch::Many(paths.to_vec())
    }
}

// =============================================================================
// chop
// =============================================================================

/// Split `items` into `n` contiguous chunks of `len / n` items.
///
/// The last chunk takes the remainder. When `len / n` is zero (fewer items
/// than chunks, or `n == 0`) everything goes into a single chunk.
pub fn chop<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    let each = items.len().checked_div(n).unwrap_or(0);
    if each == 0 {
        return vec![items.to_vec()];
    }

    let mut chunks: Vec<Vec<T>> = (0..n - 1)
        .map(|i| items[i * each..(i + 1) * each].to_vec())
        .collect();
    chunks.push(items[(n - 1) * each..].to_vec());
    chunks
}

// =============================================================================
// Tests
// =============================================================================
