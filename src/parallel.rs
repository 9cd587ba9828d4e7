use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, warn};

pub fn map_traits<I, T, F>(items: &[I], cores: Option<usize>, f: F) -> Result<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync + Send,
{
    let threads = thread_budget(cores, items.len());
    debug!("Running {} trait(s) on {threads} thread(s)", items.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("trait-{i}"))
        .build()
        .context("build trait thread pool")?;
    let results: Vec<Result<T>> = pool.install(|| items.par_iter().map(&f).collect());
    results.into_iter().collect()
}

pub fn thread_budget(cores: Option<usize>, traits: usize) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let requested = cores.unwrap_or(available).max(1);
    let budget = requested.min(traits.max(1));
    if cores.is_some() && requested > budget {
        warn!("Requested {requested} cores for {traits} trait(s); using {budget}");
    }
    budget
}
