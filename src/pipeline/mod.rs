//! Pipeline stages for catalog enrichment.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different ledger backing) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! The pipeline spans three independent runs, synchronized only through
//! the ledger file — recognition jobs complete asynchronously on the
//! service side, so hours may pass between runs:
//!
//! ```text
//! run 1   select ──▶ repath ──▶ encode ──▶ submit     ──▶ ledger (CSV)
//!         (filter)   (paths)    (base64)   (service)
//!
//! run 2   ledger ──▶ correlate                        ──▶ ledger (JSON)
//!                    (fetch results)
//!
//! run 3   ledger + catalog ──▶ merge                  ──▶ catalog (JSON)
//!                              (notes, selections)
//! ```
//!
//! 1. [`select`]    — type/tag/sentinel filtering of catalog items
//! 2. [`repath`]    — translate recorded image paths to this machine
//! 3. [`encode`]    — image bytes → base64 for the request body
//! 4. [`submit`]    — drive the submission capability, append ledger rows
//! 5. [`correlate`] — fetch one result per ledger row
//! 6. [`merge`]     — synthesize note/selection elements into the catalog

pub mod correlate;
pub mod encode;
pub mod merge;
pub mod repath;
pub mod select;
pub mod submit;

use crate::config::EnrichConfig;
use crate::service::ServiceError;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Run one service call with exponential backoff.
///
/// HTTP 429 / 5xx failures are transient and would otherwise abort a
/// multi-hundred-row run on the first blip. With the default 500 ms base
/// and 3 retries the wait sequence is 500 ms → 1 s → 2 s. Once retries are
/// exhausted the last error is returned and the run aborts — there is no
/// per-item tolerance for service failures.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &EnrichConfig,
    what: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{what}: retry {attempt}/{} after {backoff}ms",
                config.max_retries
            );
            sleep(Duration::from_millis(backoff)).await;
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{what}: attempt {} failed — {e}", attempt + 1);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(ServiceError::Request {
        detail: "no attempts made".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> EnrichConfig {
        EnrichConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ServiceError::Request {
                        detail: "blip".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_config(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ServiceError::Status {
                    status: 503,
                    detail: "down".into(),
                })
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(ServiceError::Status { status: 503, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "initial try + 2 retries");
    }
}
