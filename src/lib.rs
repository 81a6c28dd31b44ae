//! # tropy-atr
//!
//! Enrich [Tropy](https://tropy.org) catalog exports with machine-generated
//! text transcriptions from the Transkribus Processing API.
//!
//! ## Why this crate?
//!
//! Research photo collections routinely hold thousands of photographed
//! documents whose text exists only as pixels. Recognition services can
//! transcribe them, but the hard part is bookkeeping, not the network call:
//! recognition jobs complete asynchronously (up to a day later), so
//! submission, retrieval and merge are three separate runs that must agree
//! on which image maps to which job — across process and machine
//! boundaries — and the results must land back inside the catalog's own
//! graph structure without disturbing anything else in it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Tropy export (JSON-LD)
//!  │
//!  ├─ run 1  submit    select items (type/tag/sentinel) ─▶ encode images
//!  │                   ─▶ POST to the service ─▶ ledger CSV + tagged export
//!  │
//!  │         …the service works through its queue…
//!  │
//!  ├─ run 2  download  fetch one result per ledger row ─▶ ledger JSON
//!  │
//!  └─ run 3  enrich    merge transcriptions into photo notes and
//!                      per-line selections ─▶ enriched export
//! ```
//!
//! The ledger file is the only state shared between runs; re-running the
//! submission phase is safe because every submitted item is tagged with a
//! sentinel and tagged items are never selected again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tropy_atr::{
//!     run, EnrichConfig, FileLedgerStore, SubmitOptions, TranskribusProcessing,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EnrichConfig::default();
//!     // Credentials from config.credentials or TRANSKRIBUS_USER/_PASSWORD.
//!     let service = TranskribusProcessing::from_config(&config).await?;
//!     let store = FileLedgerStore::new("mapping.csv", "download.json");
//!
//!     let options = SubmitOptions {
//!         item_type: Some("Foto".into()),
//!         ..Default::default()
//!     };
//!     let outcome = run::submit_catalog(
//!         "export.json",
//!         "export_updated.json",
//!         &store,
//!         &options,
//!         &config,
//!         &service,
//!     )
//!     .await?;
//!     println!("{} images submitted", outcome.submitted_images);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tropy-atr` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! tropy-atr = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod run;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{CatalogDocument, Photo, Record};
pub use config::{Credentials, EnrichConfig, EnrichConfigBuilder};
pub use error::{EnrichError, SkipReason};
pub use ledger::{FileLedgerStore, Ledger, LedgerEntry, LedgerStore};
pub use run::{
    CatalogSummary, EnrichOptions, EnrichOutcome, SubmitOptions, SubmitOutcome,
};
pub use service::{RecognitionService, ServiceError, TranskribusProcessing};
