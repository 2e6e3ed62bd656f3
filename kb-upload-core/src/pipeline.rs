//! Pipeline coordinator: uploads every scanned file and associates each
//! accepted upload with the knowledge base.
//!
//! Per file the states are
//! `Scanned -> Uploading -> (Uploaded | UploadFailed)`, and after `Uploaded`
//! `Associating -> (Associated | AssociationFailed)`. Every file reaches
//! exactly one terminal state, and progress advances once for it.
//!
//! Uploads and associations run in two separate pools, each bounded by
//! [`PipelineConfig::concurrency`]. All upload tasks are spawned up front; a
//! task releases its upload slot before waiting for an association slot.
//! Failures stay local to the file that produced them.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::associate::associate;
use crate::config::{PipelineConfig, RetryPolicy};
use crate::contract::KnowledgeApi;
use crate::progress::ProgressReporter;
use crate::uploader::upload;

/// Terminal state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    UploadFailed,
    Associated,
    AssociationFailed,
    /// The service already holds this content; final, but not a success.
    DuplicateContent,
    /// The file's task panicked or was cancelled.
    Aborted,
}

/// Counters shared by all in-flight tasks of a run.
#[derive(Debug, Default)]
pub struct RunCounters {
    total_files: AtomicUsize,
    successful_uploads: AtomicUsize,
    successful_associations: AtomicUsize,
    failed_uploads: AtomicUsize,
    failed_associations: AtomicUsize,
    duplicate_associations: AtomicUsize,
    aborted: AtomicUsize,
}

impl RunCounters {
    pub fn new(total_files: usize) -> Self {
        let counters = RunCounters::default();
        counters.total_files.store(total_files, Ordering::Relaxed);
        counters
    }

    fn upload_accepted(&self) {
        self.successful_uploads.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, outcome: FileOutcome) {
        let counter = match outcome {
            FileOutcome::UploadFailed => &self.failed_uploads,
            FileOutcome::Associated => &self.successful_associations,
            FileOutcome::AssociationFailed => &self.failed_associations,
            FileOutcome::DuplicateContent => {
                self.duplicate_associations.fetch_add(1, Ordering::Relaxed);
                &self.failed_associations
            }
            FileOutcome::Aborted => &self.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            total_files: self.total_files.load(Ordering::Relaxed),
            successful_uploads: self.successful_uploads.load(Ordering::Relaxed),
            successful_associations: self.successful_associations.load(Ordering::Relaxed),
            failed_uploads: self.failed_uploads.load(Ordering::Relaxed),
            failed_associations: self.failed_associations.load(Ordering::Relaxed),
            duplicate_associations: self.duplicate_associations.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Final tally of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_files: usize,
    /// Uploads the service accepted with an identifier (not necessarily HTTP 200).
    pub successful_uploads: usize,
    /// Associations answered with HTTP 200.
    pub successful_associations: usize,
    pub failed_uploads: usize,
    /// Includes `duplicate_associations`.
    pub failed_associations: usize,
    pub duplicate_associations: usize,
    pub aborted: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of files that reached a terminal state.
    pub fn completed(&self) -> usize {
        self.successful_associations + self.failed_associations + self.failed_uploads + self.aborted
    }

    pub fn trace(&self) {
        info!(successful_uploads = self.successful_uploads, "Finished uploading files");
        info!(
            successful_associations = self.successful_associations,
            duplicates = self.duplicate_associations,
            "Finished associating files"
        );
        info!(
            failed_uploads = self.failed_uploads,
            failed_associations = self.failed_associations,
            aborted = self.aborted,
            "Failures during run"
        );
        info!(elapsed = ?self.elapsed, "Upload process took");
    }
}

struct Pools {
    upload: Semaphore,
    association: Semaphore,
}

/// Keep only regular files; the scanner also reports directories.
pub fn files_only(entries: Vec<PathBuf>) -> Vec<PathBuf> {
    entries.into_iter().filter(|p| p.is_file()).collect()
}

/// Run every file in `files` through upload and association.
///
/// Always drives every file to a terminal state; there is no early abort.
pub async fn run_pipeline<A>(
    api: Arc<A>,
    files: Vec<PathBuf>,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressReporter>,
) -> RunSummary
where
    A: KnowledgeApi + 'static,
{
    let started = Instant::now();
    let concurrency = if config.concurrency == 0 {
        warn!("Concurrency of 0 requested, using 1");
        1
    } else {
        config.concurrency
    };

    let counters = Arc::new(RunCounters::new(files.len()));
    let pools = Arc::new(Pools {
        upload: Semaphore::new(concurrency),
        association: Semaphore::new(concurrency),
    });
    progress.start(files.len() as u64);
    info!(total_files = files.len(), concurrency, "Dispatching uploads");

    let mut tasks = JoinSet::new();
    for path in files {
        let api = Arc::clone(&api);
        let pools = Arc::clone(&pools);
        let counters = Arc::clone(&counters);
        let retry = config.retry;
        tasks.spawn(async move {
            let outcome = AssertUnwindSafe(process_file(api.as_ref(), &path, &pools, &retry, &counters))
                .catch_unwind()
                .await;
            outcome.unwrap_or_else(|_| {
                error!(file = %path.display(), "Processing of file panicked");
                FileOutcome::Aborted
            })
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.unwrap_or_else(|e| {
            error!(error = %e, "File task did not complete");
            FileOutcome::Aborted
        });
        counters.record(outcome);
        progress.advance();
    }
    progress.finish();

    let summary = counters.snapshot(started.elapsed());
    summary.trace();
    summary
}

async fn process_file<A>(
    api: &A,
    path: &Path,
    pools: &Pools,
    retry: &RetryPolicy,
    counters: &RunCounters,
) -> FileOutcome
where
    A: KnowledgeApi + ?Sized,
{
    let uploaded = {
        let Ok(_slot) = pools.upload.acquire().await else {
            error!(file = %path.display(), "Upload pool closed");
            return FileOutcome::Aborted;
        };
        upload(api, path, retry).await
    };

    let file_id = match uploaded {
        Ok(result) => match result.file_id {
            Some(id) => id,
            None => {
                error!(
                    file = %path.display(),
                    status = result.status,
                    body = %result.body,
                    "Upload failed"
                );
                return FileOutcome::UploadFailed;
            }
        },
        Err(e) => {
            error!(file = %path.display(), error = %e, "Upload failed");
            return FileOutcome::UploadFailed;
        }
    };

    counters.upload_accepted();
    info!(file = %path.display(), file_id = %file_id, "Finished uploading file, associating with knowledge base");

    let associated = {
        let Ok(_slot) = pools.association.acquire().await else {
            error!(file = %path.display(), "Association pool closed");
            return FileOutcome::Aborted;
        };
        associate(api, &file_id, retry).await
    };

    match associated {
        Ok(result) if result.is_success() => {
            info!(file = %path.display(), file_id = %file_id, "Successfully associated file with knowledge base");
            FileOutcome::Associated
        }
        Ok(result) if result.is_duplicate() => {
            warn!(file = %path.display(), file_id = %file_id, status = result.status, "Skipped association of duplicate content");
            FileOutcome::DuplicateContent
        }
        Ok(result) => {
            error!(
                file = %path.display(),
                file_id = %file_id,
                status = result.status,
                body = %result.body,
                "Association failed"
            );
            FileOutcome::AssociationFailed
        }
        Err(e) => {
            error!(file = %path.display(), file_id = %file_id, error = %e, "Association failed");
            FileOutcome::AssociationFailed
        }
    }
}
