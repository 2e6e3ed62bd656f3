//! Association phase: link an uploaded file to the knowledge base.

use tracing::{error, info, warn};

use crate::config::RetryPolicy;
use crate::contract::{AssociationResult, KnowledgeApi};
use crate::error::ApiError;

/// Associate `file_id` with the knowledge base behind `api`.
///
/// Any status >= 400 is retried while the budget lasts, unless the body
/// reports duplicate content, which is final. Statuses below 400 are final.
pub async fn associate<A>(
    api: &A,
    file_id: &str,
    policy: &RetryPolicy,
) -> Result<AssociationResult, ApiError>
where
    A: KnowledgeApi + ?Sized,
{
    let mut retries = 0;
    loop {
        info!(file_id, retries, "Associating file with knowledge base");
        let result = AssociationResult::from(api.add_file_to_knowledge(file_id).await?);

        if result.status >= 400 && policy.can_retry(retries) {
            if result.is_duplicate() {
                warn!(file_id, status = result.status, "File content already present in knowledge base");
                return Ok(result);
            }
            let wait = policy.backoff(retries);
            error!(
                file_id,
                status = result.status,
                wait_secs = wait.as_secs_f64(),
                "Failed to associate file, reattempting after backoff"
            );
            tokio::time::sleep(wait).await;
            retries += 1;
            continue;
        }

        return Ok(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ApiResponse, MockKnowledgeApi, DUPLICATE_CONTENT_MARKER};
    use mockall::Sequence;
    use std::time::Duration;
    use tokio::time::Instant;

    fn assert_waited(started: Instant, secs: u64) {
        let waited = started.elapsed();
        let expected = Duration::from_secs(secs);
        assert!(
            waited >= expected && waited < expected + Duration::from_millis(50),
            "expected about {expected:?} of backoff, waited {waited:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_client_and_server_errors() {
        let mut api = MockKnowledgeApi::new();
        let mut seq = Sequence::new();
        for status in [400u16, 502, 200] {
            api.expect_add_file_to_knowledge()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(ApiResponse::new(status, "{}")));
        }

        let started = Instant::now();
        let result = associate(&api, "file-1", &RetryPolicy::new(3)).await.unwrap();

        assert!(result.is_success());
        assert_waited(started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_content_is_never_retried() {
        for status in [400u16, 409, 500] {
            let mut api = MockKnowledgeApi::new();
            api.expect_add_file_to_knowledge()
                .times(1)
                .returning(move |_| {
                    Ok(ApiResponse::new(
                        status,
                        format!(r#"{{"detail":"400: {DUPLICATE_CONTENT_MARKER}."}}"#),
                    ))
                });

            let result = associate(&api, "file-1", &RetryPolicy::new(5)).await.unwrap();
            assert!(result.is_duplicate());
            assert_eq!(result.status, status);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_returns_last_failure() {
        let mut api = MockKnowledgeApi::new();
        api.expect_add_file_to_knowledge()
            .times(3)
            .returning(|_| Ok(ApiResponse::new(422, "bad")));

        let started = Instant::now();
        let result = associate(&api, "file-1", &RetryPolicy::new(2)).await.unwrap();

        assert_eq!(result.status, 422);
        assert_waited(started, 1);
    }

    #[tokio::test]
    async fn sends_the_given_file_id() {
        let mut api = MockKnowledgeApi::new();
        api.expect_add_file_to_knowledge()
            .withf(|id: &str| id == "abc-123")
            .times(1)
            .returning(|_| Ok(ApiResponse::new(200, "{}")));

        let result = associate(&api, "abc-123", &RetryPolicy::new(0)).await.unwrap();
        assert!(result.is_success());
    }
}
