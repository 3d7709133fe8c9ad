//! Concurrent crawl workers
//!
//! Each worker loops `Idle -> Popping -> Acquiring -> Scanning -> Idle`.
//! The repository being processed is the worker's checkpoint: if the crawl is
//! cancelled before the cycle completes, the checkpoint is requeued so a later
//! run visits the repository again from scratch.

use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::frontier::{Frontier, expand_contributors, pop_repo};
use crate::github::Discovery;
use crate::model::EntityKind;
use crate::scanner::{Checkout, CheckoutConfig, MetadataScanner, ScanConfig};
use crate::util::format_elapsed;

use super::progress::{ProgressHandle, ProgressReporter};

const LOG_TARGET: &str = "worker";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Number of concurrent workers, at least 1
    pub workers: usize,
    /// Repositories to examine across all workers; `None` runs until cancelled
    pub target: Option<u64>,
    pub checkout: CheckoutConfig,
    pub scan: ScanConfig,
}

/// Totals over all workers of one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Completed cycles, including ones whose checkout failed
    pub cycles: u64,
    pub checkout_failures: u64,
    pub files_scanned: u64,
    pub files_skipped: u64,
    /// Newly recorded hits
    pub hits: u64,
    /// Checkpoints put back on the queue after an interruption or error
    pub requeued: u64,
}

impl CrawlSummary {
    fn merge(&mut self, other: CrawlSummary) {
        self.cycles += other.cycles;
        self.checkout_failures += other.checkout_failures;
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self.hits += other.hits;
        self.requeued += other.requeued;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Popping,
    Acquiring,
    Scanning,
    Interrupted,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Popping => "popping",
            WorkerState::Acquiring => "acquiring",
            WorkerState::Scanning => "scanning",
            WorkerState::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// Runs the crawl workers over a shared frontier
pub struct Coordinator<F, D> {
    frontier: Arc<F>,
    discovery: Arc<D>,
    config: CrawlConfig,
}

impl<F, D> Coordinator<F, D>
where
    F: Frontier + 'static,
    D: Discovery + 'static,
{
    pub fn new(frontier: Arc<F>, discovery: Arc<D>, config: CrawlConfig) -> Self {
        Self { frontier, discovery, config }
    }

    /// Run all workers until the target is reached or `cancel` fires.
    ///
    /// A worker failing on a store error cancels the others; the first such
    /// error is returned once every worker has stopped.
    pub async fn run(&self, cancel: CancellationToken, progress: &dyn ProgressReporter) -> Result<CrawlSummary> {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        let completed = Arc::new(AtomicU64::new(0));
        let pb = progress.start("Crawling", self.config.target);
        // Stops workers waiting on the frontier once the target is met;
        // cycles already under way run to completion
        let finished = cancel.child_token();

        log::info!(target: LOG_TARGET, "Starting {workers} worker(s)");

        let mut set = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                frontier: Arc::clone(&self.frontier),
                discovery: Arc::clone(&self.discovery),
                scanner: MetadataScanner::new(self.config.scan.clone()),
                checkout: self.config.checkout.clone(),
                target: self.config.target,
                completed: Arc::clone(&completed),
                cancel: cancel.clone(),
                finished: finished.clone(),
                progress: Arc::clone(&pb),
                state: WorkerState::Idle,
                checkpoint: None,
            };
            set.spawn(worker.run());
        }

        let mut summary = CrawlSummary::default();
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let result = joined.map_err(|e| anyhow!("worker task failed: {e}")).and_then(|r| r);
            match result {
                Ok(worker_summary) => summary.merge(worker_summary),
                Err(e) => {
                    log::error!(target: LOG_TARGET, "Worker stopped: {e:#}");
                    cancel.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }
        pb.finish();

        log::info!(
            target: LOG_TARGET,
            "Examined {} repositories in {} ({} hits, {} requeued)",
            summary.cycles,
            format_elapsed(started.elapsed()),
            summary.hits,
            summary.requeued
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

struct Worker<F, D> {
    id: usize,
    frontier: Arc<F>,
    discovery: Arc<D>,
    scanner: MetadataScanner,
    checkout: CheckoutConfig,
    target: Option<u64>,
    completed: Arc<AtomicU64>,
    cancel: CancellationToken,
    finished: CancellationToken,
    progress: Arc<dyn ProgressHandle>,
    state: WorkerState,
    /// Repository held between pop and cycle completion
    checkpoint: Option<String>,
}

impl<F: Frontier, D: Discovery> Worker<F, D> {
    fn enter(&mut self, state: WorkerState) {
        log::trace!(target: LOG_TARGET, "worker {}: {} -> {}", self.id, self.state, state);
        self.state = state;
    }

    fn target_reached(&self) -> bool {
        self.target.is_some_and(|t| self.completed.load(Ordering::SeqCst) >= t)
    }

    async fn run(mut self) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let cancel = self.cancel.clone();
        let finished = self.finished.clone();

        loop {
            self.enter(WorkerState::Idle);
            if cancel.is_cancelled() || self.target_reached() {
                break;
            }

            self.enter(WorkerState::Popping);
            let Some(repo) = pop_repo(self.frontier.as_ref(), self.discovery.as_ref(), &finished).await? else {
                break;
            };
            self.checkpoint = Some(repo.clone());

            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = self.cycle(&repo) => Some(outcome),
            };

            match outcome {
                Some(Ok(cycle)) => summary.merge(cycle),
                Some(Err(e)) => {
                    log::error!(target: LOG_TARGET, "worker {}: {repo} failed: {e:#}", self.id);
                    match self.frontier.requeue(EntityKind::Repository, &repo).await {
                        Ok(()) => summary.requeued += 1,
                        Err(e) => log::error!(target: LOG_TARGET, "Could not requeue {repo}: {e:#}"),
                    }
                }
                None => {
                    self.enter(WorkerState::Interrupted);
                    if let Some(checkpoint) = self.checkpoint.take() {
                        self.frontier.requeue(EntityKind::Repository, &checkpoint).await?;
                        summary.requeued += 1;
                    }
                    break;
                }
            }

            self.checkpoint = None;
            let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
            summary.cycles += 1;
            self.progress.inc(1);
            if self.target.is_some_and(|t| done >= t) {
                finished.cancel();
                break;
            }
        }

        log::debug!(target: LOG_TARGET, "worker {} finished after {} cycles", self.id, summary.cycles);
        Ok(summary)
    }

    /// Expand, acquire and scan one repository
    async fn cycle(&mut self, repo: &str) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        self.progress.set_message(repo.to_string());

        expand_contributors(self.frontier.as_ref(), self.discovery.as_ref(), repo).await?;

        self.enter(WorkerState::Acquiring);
        let checkout = Checkout::create(&self.checkout, self.id)?;
        let files = match checkout.acquire(&self.checkout, repo).await {
            Ok(files) => files,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping {repo}: {e:#}");
                summary.checkout_failures += 1;
                if let Err(e) = checkout.cleanup() {
                    log::warn!(target: LOG_TARGET, "{e:#}");
                }
                return Ok(summary);
            }
        };

        self.enter(WorkerState::Scanning);
        let report = self
            .scanner
            .scan(self.frontier.as_ref(), repo, checkout.root(), &files)
            .await?;
        summary.files_scanned += report.files;
        summary.files_skipped += report.skipped;
        summary.hits += report.hits;

        if let Err(e) = checkout.cleanup() {
            log::warn!(target: LOG_TARGET, "{e:#}");
        }
        log::info!(
            target: LOG_TARGET,
            "Scanned {repo}: {} files, {} skipped, {} hits",
            report.files,
            report.skipped,
            report.hits
        );
        Ok(summary)
    }
}
