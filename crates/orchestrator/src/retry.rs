//! 阶段重试

use crate::error::OrchestratorResult;
use crate::signals::Stage;
use std::future::Future;
use std::time::Duration;

/// 执行 `op`，失败后等待 `delay` 再试，最多重试 `retries` 次
pub async fn with_retry<T, F, Fut>(
    stage: Stage,
    retries: u32,
    delay: Duration,
    mut op: F,
) -> OrchestratorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = OrchestratorResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::warn!(
                    "Stage {} failed: {}. Retry {}/{} in {:?}",
                    stage,
                    e,
                    attempt,
                    retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!("Stage {} failed after {} attempts: {}", stage, attempt + 1, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_on_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retry(Stage::Collect, 1, Duration::ZERO, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OrchestratorError::Config("transient".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = AtomicU32::new(0);
        let result: OrchestratorResult<()> =
            with_retry(Stage::Model, 2, Duration::ZERO, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OrchestratorError::Config("permanent".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
