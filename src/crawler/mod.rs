pub mod target;
pub mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::fetch::Fetcher;
pub use target::{ExtractionTarget, UnrecognizedTarget};
use worker::{CrawlResult, CrawlWorker};

/// Seed URL → extracted values, in the order each seed produced them.
pub type AggregateMap = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Cap on concurrently fetching workers. `None` or `Some(0)` means one per seed, all at once.
    pub max_concurrency: Option<usize>,
    pub progress: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    UnrecognizedTarget(#[from] UnrecognizedTarget),
}

/// Validate `target`, then scrape every seed concurrently.
///
/// Fails before any page is fetched when `target` is not a known tag kind.
pub async fn scrape<F: Fetcher>(
    fetcher: Arc<F>,
    target: &str,
    seeds: &[String],
    opts: &ScrapeOptions,
) -> Result<AggregateMap, ScrapeError> {
    let target: ExtractionTarget = target.parse()?;
    Ok(scrape_target(fetcher, target, seeds, opts).await)
}

/// Spawn one worker per seed and fan their results into a single map.
///
/// Returns once every worker has signalled completion. Seeds whose fetch
/// failed, or that matched nothing, map to an empty list.
pub async fn scrape_target<F: Fetcher>(
    fetcher: Arc<F>,
    target: ExtractionTarget,
    seeds: &[String],
    opts: &ScrapeOptions,
) -> AggregateMap {
    let mut found: AggregateMap = seeds.iter().map(|s| (s.clone(), Vec::new())).collect();
    if seeds.is_empty() {
        return found;
    }

    let start = Instant::now();
    let permits = opts
        .max_concurrency
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));
    let pb = progress_bar(seeds.len(), opts.progress);

    let (tx, rx) = mpsc::channel::<CrawlResult>(1);
    let (done_tx, done_rx) = mpsc::unbounded_channel::<()>();

    for url in seeds {
        let worker = CrawlWorker {
            url: url.clone(),
            target,
            results: tx.clone(),
            done: done_tx.clone(),
            permits: permits.clone(),
        };
        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move { worker.run(fetcher.as_ref()).await });
    }
    drop(tx);
    drop(done_tx);

    let (finished, received) = fan_in(rx, done_rx, seeds.len(), &mut found, &pb).await;

    pb.finish_and_clear();
    info!(
        "Scraped {} seeds for <{}>: {} values, {} workers finished in {:.1}s",
        seeds.len(),
        target,
        received,
        finished,
        start.elapsed().as_secs_f64()
    );
    found
}

/// Collect results until `workers` completions arrived. Returns (completions, results).
async fn fan_in(
    mut rx: mpsc::Receiver<CrawlResult>,
    mut done_rx: mpsc::UnboundedReceiver<()>,
    workers: usize,
    found: &mut AggregateMap,
    pb: &ProgressBar,
) -> (usize, usize) {
    let mut finished = 0usize;
    let mut received = 0usize;
    while finished < workers {
        tokio::select! {
            Some(result) = rx.recv() => {
                found.entry(result.seed).or_default().push(result.value);
                received += 1;
            }
            Some(()) = done_rx.recv() => {
                finished += 1;
                pb.inc(1);
            }
            // Workers signal from a drop guard, so both channels only close early
            // when a spawned task was dropped before its first poll (runtime shutdown).
            else => {
                warn!(finished, workers, "all workers gone before every completion arrived");
                break;
            }
        }
    }

    // A worker's last result can still be buffered when its completion lands first.
    while let Ok(result) = rx.try_recv() {
        found.entry(result.seed).or_default().push(result.value);
        received += 1;
    }
    (finished, received)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
