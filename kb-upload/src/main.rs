use anyhow::Result;
use clap::Parser;
use kb_upload::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    tracing::debug!(target_dir = %cli.target_dir.display(), "CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(summary) => tracing::info!(
            total_files = summary.total_files,
            completed = summary.completed(),
            "kb-upload finished"
        ),
        Err(e) => tracing::error!(error = %e, "kb-upload exited with error"),
    }
    result.map(|_| ())
}
