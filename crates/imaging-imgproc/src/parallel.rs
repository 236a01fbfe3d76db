use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The row stride must be valid.
    #[error("row stride must be > 0, got {0}")]
    InvalidRowStride(usize),

    /// The buffer length does not match rows times stride.
    #[error("buffer length ({0}) does not match rows * stride ({1})")]
    SizeMismatch(usize, usize),
}

/// Controls how row-parallel operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ExecutionStrategy {
    /// Use the global Rayon thread pool and hand out whole rows to the workers.
    ///
    /// Rows are disjoint, so the workers never need to synchronize.
    #[default]
    ParallelRows,

    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// A fixed pool sized to the hardware threads minus `reserved`, with at least one worker.
    ///
    /// Reserving threads keeps the caller's own thread responsive while a filter runs.
    pub fn reserving(reserved: usize) -> Self {
        ExecutionStrategy::Fixed(worker_count(reserved))
    }
}

/// Number of hardware threads minus `reserved`, never less than one.
pub fn worker_count(reserved: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(reserved)
        .max(1)
}

/// Apply `f` to every row of `dst` whose index lies in `[margin, rows - margin)`.
///
/// The closure receives the row index and the mutable row slice. Rows outside the range are
/// left untouched, which is how the rank filters pass the border through.
///
/// # Arguments
///
/// * `dst` - The destination buffer with `rows * row_stride` elements.
/// * `row_stride` - Number of elements per row (width * channels).
/// * `margin` - Number of rows skipped at the top and at the bottom.
/// * `strategy` - The execution strategy.
/// * `f` - The per-row operation.
pub fn par_iter_interior_rows<T, F>(
    dst: &mut [T],
    row_stride: usize,
    margin: usize,
    strategy: ExecutionStrategy,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_stride == 0 {
        return Err(ParallelError::InvalidRowStride(row_stride));
    }

    if dst.len() % row_stride != 0 {
        let rows = dst.len() / row_stride;
        return Err(ParallelError::SizeMismatch(dst.len(), rows * row_stride));
    }

    let rows = dst.len() / row_stride;
    if rows <= 2 * margin {
        return Ok(());
    }
    let interior = &mut dst[margin * row_stride..(rows - margin) * row_stride];

    match strategy {
        ExecutionStrategy::Serial => {
            interior
                .chunks_exact_mut(row_stride)
                .enumerate()
                .for_each(|(r, row)| f(r + margin, row));
        }
        ExecutionStrategy::ParallelRows => {
            interior
                .par_chunks_exact_mut(row_stride)
                .enumerate()
                .for_each(|(r, row)| f(r + margin, row));
        }
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            // even static partition: every worker gets a contiguous block of rows
            let block = (rows - 2 * margin).div_ceil(n).max(1);
            pool.install(|| {
                interior
                    .par_chunks_exact_mut(row_stride)
                    .enumerate()
                    .with_min_len(block)
                    .for_each(|(r, row)| f(r + margin, row));
            });
        }
    }
    Ok(())
}
