//! Progress reporting seam. The CLI plugs a terminal progress bar in here.

/// Receives one `advance` per file that reaches a terminal state.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64);
    fn advance(&self);
    fn finish(&self);
}

/// Reporter that discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _total: u64) {}
    fn advance(&self) {}
    fn finish(&self) {}
}
