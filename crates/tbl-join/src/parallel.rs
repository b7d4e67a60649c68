//! Crate-local rayon pool for the as-of probe phase.
//!
//! The pool is built lazily and never panics: if no pool can be created the
//! probe runs on the calling thread.

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

/// Probes over fewer left rows than this stay serial unless forced.
pub(crate) const PARALLEL_MIN_ROWS: usize = 16_384;

#[cfg(feature = "parallel")]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(feature = "parallel")]
fn desired_threads() -> usize {
    let from_env = std::env::var("TBL_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(feature = "parallel")]
fn build_pool() -> Option<ThreadPool> {
    let requested = desired_threads().max(1);
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(_) if requested > 1 => try_build(1).ok(),
        Err(_) => None,
    }
}

#[cfg(feature = "parallel")]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_pool).as_ref()
}

/// `(0..len).map(f)`, on the pool when `parallel` is set and one exists.
/// Output order is the index order either way.
#[cfg(feature = "parallel")]
pub(crate) fn map_indices<T, F>(len: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel && let Some(pool) = rayon_pool() {
        use rayon::prelude::*;

        log::trace!("probing {len} rows on {} threads", pool.current_num_threads());
        return pool.install(|| (0..len).into_par_iter().map(&f).collect());
    }
    (0..len).map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indices<T, F>(len: usize, _parallel: bool, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..len).map(f).collect()
}
