//! The external recognition capability.
//!
//! The pipeline consumes the service through [`RecognitionService`], a
//! deliberately narrow contract: submit one base64 image for processing,
//! fetch one result by job id. Everything else — authentication, base URLs,
//! transport — is the implementation's business. Tests substitute an
//! in-memory implementation; production uses [`transkribus`].

pub mod transkribus;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use transkribus::TranskribusProcessing;

/// Errors surfaced by a [`RecognitionService`] implementation.
///
/// All variants are fatal to the calling run once the pipeline's retries
/// are exhausted; there is no per-item tolerance for service failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Authentication with the service failed.
    #[error("authentication failed: {detail}")]
    Auth { detail: String },

    /// The request never produced a response (DNS, TLS, timeout, …).
    #[error("request failed: {detail}")]
    Request { detail: String },

    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not have the promised shape.
    #[error("malformed service response: {detail}")]
    MalformedResponse { detail: String },
}

/// Asynchronous recognition service: submit images, fetch results.
///
/// Both calls are awaited one at a time by the pipeline — implementations
/// do not need to support concurrent use within a run, but must be `Send +
/// Sync` so one client can serve all phases.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Submit one image for layout detection and text recognition.
    ///
    /// Returns the service's job identifier for later retrieval.
    async fn submit(
        &self,
        line_model_id: u64,
        atr_model_id: u64,
        image_base64: &str,
    ) -> Result<String, ServiceError>;

    /// Fetch the processing status and result for a job.
    ///
    /// The payload is returned verbatim; the pipeline stores it in the
    /// ledger and interprets it only at merge time.
    async fn fetch_result(&self, process_id: &str) -> Result<Value, ServiceError>;
}
