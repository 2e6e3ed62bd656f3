//! Upload phase: send a file, retrying on server errors.

use std::path::Path;

use tracing::{error, info};

use crate::config::RetryPolicy;
use crate::contract::{KnowledgeApi, UploadResult};
use crate::error::ApiError;

/// Upload `path` through `api`.
///
/// A response with status >= 500 is retried while the budget in `policy`
/// lasts, waiting `policy.backoff(retries)` first. Anything else, including
/// 4xx, is final. Transport and file-read errors are returned immediately.
pub async fn upload<A>(api: &A, path: &Path, policy: &RetryPolicy) -> Result<UploadResult, ApiError>
where
    A: KnowledgeApi + ?Sized,
{
    let mut retries = 0;
    loop {
        info!(file = %path.display(), retries, "Attempting upload of file");
        let response = api.upload_file(path).await?;

        if response.is_server_error() && policy.can_retry(retries) {
            let wait = policy.backoff(retries);
            error!(
                file = %path.display(),
                status = response.status,
                wait_secs = wait.as_secs_f64(),
                "Failed to upload file, reattempting after backoff"
            );
            tokio::time::sleep(wait).await;
            retries += 1;
            continue;
        }

        return Ok(UploadResult::from_response(response));
    }
}
