//! Correlation: fetch one recognition result per ledger row.
//!
//! Runs after the service has had time to complete the jobs recorded by
//! the submission phase — typically a separate process invocation. Each
//! row's payload is attached in place; the augmented ledger is then
//! persisted for the merge phase.
//!
//! Any fetch failure (job not found, not yet ready, transport error)
//! aborts the remainder of the run once retries are exhausted. Rows
//! already fetched are not re-fetched on the next attempt only if the
//! caller persisted them — this phase itself keeps no partial state.

use crate::config::EnrichConfig;
use crate::error::EnrichError;
use crate::ledger::Ledger;
use crate::pipeline::with_retry;
use crate::service::RecognitionService;
use tracing::info;

/// Fetch and attach the result payload for every ledger row.
///
/// Returns the number of payloads attached.
pub(crate) async fn attach_results(
    ledger: &mut Ledger,
    config: &EnrichConfig,
    service: &dyn RecognitionService,
) -> Result<usize, EnrichError> {
    let mut fetched = 0;
    for entry in ledger.iter_mut() {
        let payload = with_retry(
            config,
            &format!("item {} process {}", entry.item_id, entry.process_id),
            || service.fetch_result(&entry.process_id),
        )
        .await?;

        info!(
            "Fetched result for item {} image {} (process {})",
            entry.item_id, entry.photo_index, entry.process_id
        );
        entry.result = Some(payload);
        fetched += 1;
    }
    Ok(fetched)
}
