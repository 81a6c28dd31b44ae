//! Error types for the tropy-atr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EnrichError`] — **Fatal**: the phase cannot proceed at all (unparsable
//!   export, missing ledger file, service authentication failure). Returned
//!   as `Err(EnrichError)` from the top-level phase functions in
//!   [`crate::run`].
//!
//! * [`SkipReason`] — **Non-fatal**: a single item or image could not be
//!   handled (photo index out of range, empty transcription) but the rest of
//!   the run is fine. Logged per item and collected into the phase outcome
//!   structs so callers can inspect partial success rather than losing a
//!   whole batch to one bad record.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first skipped item, log and continue, or collect all skips for a post-run
//! report.

use crate::service::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the tropy-atr library.
///
/// Item-level conditions use [`SkipReason`] and are stored in the phase
/// outcome structs rather than propagated here.
#[derive(Debug, Error)]
pub enum EnrichError {
    // ── Catalog input errors ──────────────────────────────────────────────
    /// Export file was not found at the given path.
    #[error("Tropy export not found: '{path}'\nCheck the path exists and is readable.")]
    CatalogNotFound { path: PathBuf },

    /// The file exists but is not valid JSON.
    #[error("'{path}' is not a valid Tropy export file: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but does not have the expected export shape.
    #[error("'{path}' has no '@graph' item list — is this a Tropy export?")]
    CatalogShape { path: PathBuf },

    /// A record node could not be read as an item.
    #[error("item at position {index} could not be parsed: {source}")]
    RecordShape {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    // ── Ledger errors ─────────────────────────────────────────────────────
    /// Ledger file was not found at the given path.
    #[error("ledger file not found: '{path}'\nRun the submission phase first.")]
    LedgerNotFound { path: PathBuf },

    /// Ledger file exists but cannot be parsed.
    #[error("ledger file '{path}' is malformed: {detail}")]
    LedgerParse { path: PathBuf, detail: String },

    // ── Submission errors ─────────────────────────────────────────────────
    /// The lowest common directory given for path remapping does not exist.
    #[error("directory '{path}' does not exist")]
    DirectoryNotFound { path: PathBuf },

    /// The common directory's basename does not occur in a recorded path.
    #[error("cannot remap '{path}': component '{anchor}' not found")]
    RemapFailed { path: String, anchor: String },

    /// An image file could not be read.
    #[error("failed to read image '{path}': {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A photo node carries no path to load an image from.
    #[error("item '{id}' photo {index} has no image path")]
    PhotoPathMissing { id: String, index: usize },

    // ── Service errors ────────────────────────────────────────────────────
    /// The recognition service failed; retries (if configured) exhausted.
    #[error("recognition service error: {0}")]
    Service(#[from] ServiceError),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal, per-item condition.
///
/// Logged when encountered and collected into [`crate::run::SubmitOutcome`]
/// / [`crate::run::EnrichOutcome`]. The run continues with the next image or
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The requested photo index does not exist on this item.
    #[error("item '{id}' has no photo with index {index}")]
    PhotoIndexOutOfRange { id: String, index: usize },

    /// The item has no photo list at all.
    #[error("item '{id}' has no photos")]
    NoPhotos { id: String },

    /// The item has no identifier, so it cannot be keyed in the ledger.
    #[error("item at position {index} has no identifier")]
    NoIdentifier { index: usize },

    /// No ledger row exists for this item.
    #[error("item '{id}' has no ledger entry, it was never submitted")]
    NoLedgerEntry { id: String },

    /// A ledger row exists but carries no downloaded result payload.
    #[error("item '{id}' has no result, previous processing or download failed")]
    NoResult { id: String },

    /// The result payload lacks an expected field.
    #[error("item '{id}' result payload is missing '{field}'")]
    PayloadShape { id: String, field: String },

    /// The recognised text is empty; the item is left unmodified.
    #[error("item '{id}' not enriched, empty transcription")]
    EmptyTranscription { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_failed_display() {
        let e = EnrichError::RemapFailed {
            path: r"C:\Users\X\proj\img.jpg".into(),
            anchor: "archive".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("archive"), "got: {msg}");
        assert!(msg.contains(r"C:\Users\X\proj\img.jpg"));
    }

    #[test]
    fn skip_reason_display() {
        let s = SkipReason::PhotoIndexOutOfRange {
            id: "obj-17".into(),
            index: 3,
        };
        assert!(s.to_string().contains("obj-17"));
        assert!(s.to_string().contains('3'));
    }

    #[test]
    fn empty_transcription_display() {
        let s = SkipReason::EmptyTranscription { id: "obj-1".into() };
        assert!(s.to_string().contains("empty transcription"));
    }
}
