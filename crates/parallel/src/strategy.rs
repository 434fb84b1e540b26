//! Processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for per-tile work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
}

impl ProcessingMode {
    /// Map `f` over `items` and collect results in input order
    pub fn map_collect<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel => items.into_iter().map(f).collect(),
        }
    }
}

/// Number of worker threads available to `ProcessingMode::Parallel`
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
