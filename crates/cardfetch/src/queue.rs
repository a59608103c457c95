use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use image::RgbaImage;
use reqwest::Url;
use tracing::{debug, warn};

use crate::fetcher::ImageFetcher;
use crate::source::CardSource;
use crate::FetchError;

/// What a fetched image is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Card(usize),
    CardBack,
}

#[derive(Debug, Clone)]
pub struct FetchJob {
    pub target: FetchTarget,
    pub url: Url,
}

impl FetchJob {
    /// One job per grid slot plus the shared card back when configured.
    pub fn for_grid(source: &CardSource, card_count: usize) -> Vec<FetchJob> {
        let mut jobs: Vec<FetchJob> = source
            .card_back()
            .map(|url| FetchJob {
                target: FetchTarget::CardBack,
                url: url.clone(),
            })
            .into_iter()
            .collect();
        jobs.extend((0..card_count).map(|index| FetchJob {
            target: FetchTarget::Card(index),
            url: source.url_for(index),
        }));
        jobs
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub target: FetchTarget,
    pub result: Result<Arc<RgbaImage>, FetchError>,
}

/// Fixed pool of worker threads draining a job list.
///
/// Completed images come back over a channel for the frame thread to pick up;
/// nothing else touches the menu from the workers. Cancelling (or dropping the
/// queue) stops workers from starting new jobs and discards in-flight results.
/// Dropping never waits on a request still in flight.
pub struct FetchQueue {
    results: Receiver<FetchOutcome>,
    cancel: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    total: usize,
    received: usize,
}

impl FetchQueue {
    pub fn spawn(
        fetcher: Arc<dyn ImageFetcher>,
        jobs: Vec<FetchJob>,
        concurrency: usize,
    ) -> Result<Self, FetchError> {
        let total = jobs.len();
        let (job_tx, job_rx) = unbounded();
        for job in jobs {
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let (result_tx, result_rx) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_count = concurrency.max(1).min(total);
        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let fetcher = Arc::clone(&fetcher);
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let cancel = Arc::clone(&cancel);
            let handle = thread::Builder::new()
                .name(format!("cardfetch-{worker}"))
                .spawn(move || run_worker(fetcher.as_ref(), jobs, results, &cancel))
                .map_err(FetchError::Spawn)?;
            workers.push(handle);
        }
        debug!(jobs = total, workers = worker_count, "started fetch queue");

        Ok(Self {
            results: result_rx,
            cancel,
            workers,
            total,
            received: 0,
        })
    }

    /// Everything that finished since the last call, without blocking.
    pub fn try_drain(&mut self) -> Vec<FetchOutcome> {
        let drained: Vec<FetchOutcome> = self.results.try_iter().collect();
        self.received += drained.len();
        drained
    }

    /// Waits up to `timeout` for the next outcome.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        match self.results.recv_timeout(timeout) {
            Ok(outcome) => {
                self.received += 1;
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Jobs whose outcome has not been received yet.
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.received)
    }

    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::Relaxed) {
            debug!(pending = self.pending(), "cancelling fetch queue");
        }
    }
}

impl Drop for FetchQueue {
    fn drop(&mut self) {
        self.cancel();
        // A worker blocked in a request exits on its own once the fetch returns,
        // so only finished workers are joined.
        let mut detached = 0;
        for handle in self.workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                detached += 1;
            }
        }
        if detached > 0 {
            debug!(workers = detached, "detached in-flight fetch workers");
        }
    }
}

fn run_worker(
    fetcher: &dyn ImageFetcher,
    jobs: Receiver<FetchJob>,
    results: Sender<FetchOutcome>,
    cancel: &AtomicBool,
) {
    while let Ok(job) = jobs.recv() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let result = fetcher.fetch(&job.url).map(Arc::new);
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if let Err(err) = &result {
            warn!(job = ?job.target, url = %job.url, error = %err, "image fetch failed");
        }
        let outcome = FetchOutcome {
            target: job.target,
            result,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
}
