//! Local stand-in for the batch execution framework: one task per split on a
//! dedicated `rayon` pool.
use planner::Split;
use rayon::prelude::*;

use crate::BatchError;

#[derive(Debug)]
pub struct LocalScheduler {
    pool: rayon::ThreadPool,
}

impl LocalScheduler {
    /// A pool of `threads` workers; 0 means one per available core.
    pub fn new(threads: usize) -> Result<Self, BatchError> {
        let threads = if threads == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("split-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `worker` once per split and returns the results in split order.
    pub fn run<T, F>(&self, splits: &[Split], worker: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &Split) -> T + Sync + Send,
    {
        self.pool
            .install(|| splits.par_iter().enumerate().map(|(index, split)| worker(index, split)).collect())
    }
}
