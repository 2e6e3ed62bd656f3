use std::time::Duration;
use tracing::{debug, info};

/// Document suffixes uploaded when no filter is given.
pub const DEFAULT_FILE_FILTER: &str = r"(?:\.pdf|\.txt|\.doc|\.docx|\.md|\.xlsx)$";

pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const DEFAULT_CONCURRENCY: usize = 2;

/// Linear backoff: before retry `n` the client waits `backoff_unit * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            backoff_unit: Duration::from_secs(1),
        }
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Wait before the next attempt, given how many retries have happened so far.
    pub fn backoff(&self, retries: u32) -> Duration {
        self.backoff_unit * retries
    }

    pub fn can_retry(&self, retries: u32) -> bool {
        retries < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(DEFAULT_MAX_RETRIES)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Size of the upload pool and, separately, of the association pool.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn new(concurrency: usize, retry: RetryPolicy) -> Self {
        PipelineConfig { concurrency, retry }
    }

    pub fn trace_loaded(&self) {
        info!(
            concurrency = self.concurrency,
            max_retries = self.retry.max_retries,
            "Loaded pipeline config"
        );
        debug!(?self, "Pipeline config loaded (full debug)");
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::new(DEFAULT_CONCURRENCY, RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn backoff_is_linear_in_retry_count() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn retry_budget_is_exclusive_upper_bound() {
        let policy = RetryPolicy::new(2);
        assert!(policy.can_retry(0));
        assert!(policy.can_retry(1));
        assert!(!policy.can_retry(2));
        assert!(!RetryPolicy::new(0).can_retry(0));
    }

    #[test]
    fn default_filter_matches_document_suffixes_only() {
        let re = Regex::new(DEFAULT_FILE_FILTER).unwrap();
        for ok in ["/a/b.pdf", "/a/b.txt", "/a/b.doc", "/a/b.docx", "/a/b.md", "/a/b.xlsx"] {
            assert!(re.is_match(ok), "{ok} should match");
        }
        for skip in ["/a/b.png", "/a/b.pdf.bak", "/a/bxlsx", "/a/md"] {
            assert!(!re.is_match(skip), "{skip} should not match");
        }
    }
}
