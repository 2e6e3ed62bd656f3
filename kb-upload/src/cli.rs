//! CLI glue for kb-upload: argument parsing, validation and wiring of the
//! core pipeline to the HTTP client and progress bar.
//!
//! All scanning, retry and coordination logic lives in `kb-upload-core`.
//! [`run`] is the async entrypoint shared by `main()` and integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kb_upload_core::config::{
    PipelineConfig, RetryPolicy, DEFAULT_CONCURRENCY, DEFAULT_FILE_FILTER, DEFAULT_MAX_RETRIES,
};
use kb_upload_core::pipeline::{files_only, run_pipeline, RunSummary};
use kb_upload_core::scan::scan;
use regex::Regex;

use crate::progress::BarProgress;
use crate::upload::KnowledgeClient;

/// Upload a directory tree of documents to a knowledge base.
#[derive(Parser, Debug)]
#[command(
    name = "kb-upload",
    version,
    about = "Upload a local directory tree of documents to a knowledge base"
)]
pub struct Cli {
    /// The target directory to upload
    pub target_dir: PathBuf,

    /// The knowledge base to upload to
    #[arg(env = "KB_UPLOAD_KNOWLEDGE_BASE")]
    pub knowledge_base: String,

    /// The auth token to use for the upload
    #[arg(env = "KB_UPLOAD_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,

    /// The base URL to use for upload: http(s)://hostname(:port)
    #[arg(env = "KB_UPLOAD_BASE_URL")]
    pub base_url: String,

    /// The number of concurrent uploads (and, separately, associations)
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub threads: usize,

    /// The regular expression a file's absolute path must match to be uploaded
    #[arg(short, long, default_value = DEFAULT_FILE_FILTER)]
    pub filetypes: String,

    /// The number of retries when a failure occurs
    #[arg(short, long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,
}

fn validate_base_url(raw: &str) -> Result<String> {
    let url = reqwest::Url::parse(raw).with_context(|| format!("Invalid base URL {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Base URL must use http or https, got {:?}", url.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Scan `cli.target_dir`, then upload and associate every matching file.
///
/// Per-file failures are logged and counted in the returned summary; only
/// invalid arguments or an unreadable target directory are errors.
pub async fn run(cli: Cli) -> Result<RunSummary> {
    let filter = Regex::new(&cli.filetypes)
        .with_context(|| format!("Invalid file type pattern {:?}", cli.filetypes))?;
    let base_url = validate_base_url(&cli.base_url)?;

    let entries = scan(&cli.target_dir, &filter)
        .with_context(|| format!("Failed to scan {}", cli.target_dir.display()))?;
    let files = files_only(entries);
    tracing::info!(
        count = files.len(),
        knowledge_base = %cli.knowledge_base,
        "Found files that will be uploaded to the knowledge base"
    );

    let client = KnowledgeClient::new(&base_url, cli.knowledge_base, cli.auth_token)
        .context("Failed to construct HTTP client")?;
    let config = PipelineConfig::new(cli.threads, RetryPolicy::new(cli.retries));
    config.trace_loaded();

    let summary = run_pipeline(Arc::new(client), files, &config, Arc::new(BarProgress::new())).await;
    Ok(summary)
}
