//! Phase entry points.
//!
//! The pipeline is three independent runs — **submit**, **download**,
//! **enrich** — typically separated by hours while the recognition service
//! works through its queue, and possibly executed on different machines.
//! Each phase exists in two forms:
//!
//! * an in-memory function operating on [`CatalogDocument`] / [`Ledger`]
//!   values, for callers that manage their own I/O;
//! * a `*_catalog` / `*_results` wrapper that loads the inputs, runs the
//!   phase, and persists the outputs through a [`LedgerStore`] — the form
//!   the CLI uses.
//!
//! Execution is strictly sequential: one item, one image, one service call
//! at a time. The only state shared between runs is the ledger file.

use crate::catalog::{record, CatalogDocument, Record};
use crate::config::EnrichConfig;
use crate::error::{EnrichError, SkipReason};
use crate::ledger::{Ledger, LedgerStore};
use crate::pipeline::select::{self, Eligibility, RecordFilter};
use crate::pipeline::submit::{self, SubmissionContext};
use crate::pipeline::{correlate, merge};
use crate::service::RecognitionService;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

// ── Options ──────────────────────────────────────────────────────────────

/// Per-run inputs of the submission phase.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Only submit items of exactly this type.
    pub item_type: Option<String>,
    /// Only submit items carrying this tag.
    pub tag: Option<String>,
    /// Only submit the photo at this index; all photos when `None`.
    pub photo_index: Option<usize>,
    /// Lowest directory shared with the authoring machine, for path
    /// remapping. `None` when the recorded paths resolve as-is.
    pub lowest_common_dir: Option<String>,
    /// Override the configured line-detection model.
    pub line_model_id: Option<u64>,
    /// Override the configured text-recognition model.
    pub atr_model_id: Option<u64>,
}

/// Per-run inputs of the enrichment phase.
#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Also synthesize one selection element per recognised line.
    pub lines: bool,
}

// ── Outcomes ─────────────────────────────────────────────────────────────

/// What the submission phase did.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// One row per submitted image, in document order.
    pub ledger: Ledger,
    /// Items that passed selection and were attempted.
    pub selected_records: usize,
    /// Images successfully submitted.
    pub submitted_images: usize,
    /// Non-fatal per-item skips.
    pub skipped: Vec<SkipReason>,
}

/// What the enrichment phase did.
#[derive(Debug)]
pub struct EnrichOutcome {
    /// Items that received a note (and possibly selections).
    pub enriched_records: usize,
    /// Selection elements added across all items.
    pub selections_added: usize,
    /// Non-fatal per-item skips.
    pub skipped: Vec<SkipReason>,
}

/// Catalog overview returned by [`inspect`].
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub records: usize,
    pub types: BTreeSet<String>,
}

// ── Phase: submit ────────────────────────────────────────────────────────

/// Submit the selected items' images for recognition.
///
/// Selection is conjunctive over the options' type and tag filters, minus
/// items already carrying the sentinel tag (the idempotence guard — on a
/// catalog where every target item is tagged, this is a no-op and the
/// returned ledger is empty).
///
/// Every attempted item is tagged with the sentinel afterwards, whether or
/// not all of its images went through, so a re-run never double-submits.
pub async fn submit(
    catalog: &mut CatalogDocument,
    options: &SubmitOptions,
    config: &EnrichConfig,
    service: &dyn RecognitionService,
) -> Result<SubmitOutcome, EnrichError> {
    info!(
        "Starting submission: {} items, type={:?}, tag={:?}, photo_index={:?}",
        catalog.len(),
        options.item_type,
        options.tag,
        options.photo_index
    );

    // ── Step 1: Validate run inputs ──────────────────────────────────────
    if let Some(item_type) = &options.item_type {
        if !catalog.types().contains(item_type) {
            warn!("Item type '{item_type}' is not present in the catalog; nothing will match.");
        }
    }
    if let Some(dir) = &options.lowest_common_dir {
        if !Path::new(dir).is_dir() {
            return Err(EnrichError::DirectoryNotFound { path: dir.into() });
        }
    }

    let filter = RecordFilter {
        item_type: options.item_type.clone(),
        tag: options.tag.clone(),
    };
    let ctx = SubmissionContext {
        config,
        service,
        line_model_id: options.line_model_id.unwrap_or(config.line_model_id),
        atr_model_id: options.atr_model_id.unwrap_or(config.atr_model_id),
        lowest_common_dir: options.lowest_common_dir.as_deref(),
    };

    // ── Step 2: Walk the items in document order ─────────────────────────
    let mut outcome = SubmitOutcome {
        ledger: Ledger::new(),
        selected_records: 0,
        submitted_images: 0,
        skipped: Vec::new(),
    };

    for (index, node) in catalog.records_mut().iter_mut().enumerate() {
        let item = Record::from_node(node)
            .map_err(|source| EnrichError::RecordShape { index, source })?;

        match select::eligibility(&item, &filter, &config.processed_tag) {
            Eligibility::FilteredOut => continue,
            Eligibility::AlreadyProcessed => {
                info!(
                    "Item {} skipped (already processed).",
                    item.identifier.as_deref().unwrap_or("<unidentified>")
                );
                continue;
            }
            Eligibility::Eligible => {}
        }

        let Some(item_id) = item.identifier.clone() else {
            let skip = SkipReason::NoIdentifier { index };
            warn!("{skip}");
            outcome.skipped.push(skip);
            continue;
        };

        // ── Step 3: Submit each selected image, then tag the item ────────
        outcome.selected_records += 1;
        outcome.submitted_images += submit::submit_record(
            &ctx,
            &item,
            &item_id,
            options.photo_index,
            &mut outcome.ledger,
            &mut outcome.skipped,
        )
        .await?;

        record::add_tag(node, &config.processed_tag);
        info!("Item {item_id} processed.");
    }

    info!(
        "Submission complete: {} images from {} items, {} skips",
        outcome.submitted_images,
        outcome.selected_records,
        outcome.skipped.len()
    );
    Ok(outcome)
}

/// Load a catalog, run [`submit`], persist the ledger and the updated
/// catalog.
///
/// The ledger is written before the catalog: a crash between the two
/// leaves submitted jobs retrievable, while the reverse order would tag
/// items whose job ids were lost.
pub async fn submit_catalog(
    catalog_path: impl AsRef<Path>,
    catalog_save_path: impl AsRef<Path>,
    store: &dyn LedgerStore,
    options: &SubmitOptions,
    config: &EnrichConfig,
    service: &dyn RecognitionService,
) -> Result<SubmitOutcome, EnrichError> {
    let mut catalog = CatalogDocument::load(catalog_path).await?;
    let outcome = submit(&mut catalog, options, config, service).await?;
    store.save_submissions(&outcome.ledger)?;
    catalog.save(catalog_save_path).await?;
    Ok(outcome)
}

// ── Phase: download ──────────────────────────────────────────────────────

/// Fetch the recognition result for every ledger row.
///
/// Returns the number of payloads attached. Any fetch failure aborts the
/// run once retries are exhausted; run again later if jobs were still
/// pending.
pub async fn download(
    ledger: &mut Ledger,
    config: &EnrichConfig,
    service: &dyn RecognitionService,
) -> Result<usize, EnrichError> {
    info!("Starting download: {} ledger rows", ledger.len());
    let fetched = correlate::attach_results(ledger, config, service).await?;
    info!("Download complete: {fetched} results fetched");
    Ok(fetched)
}

/// Load the submission ledger, run [`download`], persist the augmented
/// ledger.
pub async fn download_results(
    store: &dyn LedgerStore,
    config: &EnrichConfig,
    service: &dyn RecognitionService,
) -> Result<Ledger, EnrichError> {
    let mut ledger = store.load_submissions()?;
    download(&mut ledger, config, service).await?;
    store.save_results(&ledger)?;
    Ok(ledger)
}

// ── Phase: enrich ────────────────────────────────────────────────────────

/// Write downloaded transcriptions into the catalog.
///
/// Only items carrying the sentinel tag are considered; each is looked up
/// in the ledger by identifier. Items without an entry, without a payload,
/// or with an empty transcription are skipped with a diagnostic and left
/// byte-for-byte unchanged.
pub fn enrich(
    catalog: &mut CatalogDocument,
    ledger: &Ledger,
    options: &EnrichOptions,
    config: &EnrichConfig,
) -> Result<EnrichOutcome, EnrichError> {
    info!(
        "Starting enrichment: {} items, {} ledger rows, lines={}",
        catalog.len(),
        ledger.len(),
        options.lines
    );

    let mut outcome = EnrichOutcome {
        enriched_records: 0,
        selections_added: 0,
        skipped: Vec::new(),
    };

    for (index, node) in catalog.records_mut().iter_mut().enumerate() {
        if !record::node_has_tag(node, &config.processed_tag) {
            continue;
        }

        let Some(item_id) = node
            .get("identifier")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            let skip = SkipReason::NoIdentifier { index };
            warn!("{skip}");
            outcome.skipped.push(skip);
            continue;
        };

        let Some(entry) = ledger.get(&item_id) else {
            let skip = SkipReason::NoLedgerEntry { id: item_id };
            warn!("{skip}");
            outcome.skipped.push(skip);
            continue;
        };

        match merge::enrich_node(node, &item_id, entry, options.lines, config) {
            Ok(selections) => {
                outcome.enriched_records += 1;
                outcome.selections_added += selections;
                info!("Successfully enriched item {item_id}.");
            }
            Err(skip) => {
                warn!("{skip}");
                outcome.skipped.push(skip);
            }
        }
    }

    info!(
        "Enrichment complete: {} items enriched, {} selections, {} skips",
        outcome.enriched_records,
        outcome.selections_added,
        outcome.skipped.len()
    );
    Ok(outcome)
}

/// Load a catalog and the augmented ledger, run [`enrich`], persist the
/// enriched catalog.
pub async fn enrich_catalog(
    catalog_path: impl AsRef<Path>,
    catalog_save_path: impl AsRef<Path>,
    store: &dyn LedgerStore,
    options: &EnrichOptions,
    config: &EnrichConfig,
) -> Result<EnrichOutcome, EnrichError> {
    let mut catalog = CatalogDocument::load(catalog_path).await?;
    let ledger = store.load_results()?;
    let outcome = enrich(&mut catalog, &ledger, options, config)?;
    catalog.save(catalog_save_path).await?;
    Ok(outcome)
}

// ── Inspect ──────────────────────────────────────────────────────────────

/// Summarise a catalog without touching the service.
pub fn inspect(catalog: &CatalogDocument) -> CatalogSummary {
    CatalogSummary {
        records: catalog.len(),
        types: catalog.types(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{RecognitionService, ServiceError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Hands out sequential process ids and records nothing.
    struct SequentialService {
        next_id: AtomicU64,
    }

    impl SequentialService {
        fn new() -> Self {
            Self {
                next_id: AtomicU64::new(91001),
            }
        }
    }

    #[async_trait]
    impl RecognitionService for SequentialService {
        async fn submit(
            &self,
            _line_model_id: u64,
            _atr_model_id: u64,
            _image_base64: &str,
        ) -> Result<String, ServiceError> {
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
        }

        async fn fetch_result(&self, process_id: &str) -> Result<Value, ServiceError> {
            Ok(json!({"processId": process_id, "content": {"text": "", "regions": []}}))
        }
    }

    fn config() -> EnrichConfig {
        EnrichConfig::default()
    }

    async fn catalog_with_images(dir: &tempfile::TempDir) -> CatalogDocument {
        let img = dir.path().join("img.jpg");
        tokio::fs::write(&img, b"bytes").await.unwrap();
        let img = img.to_string_lossy().to_string();
        CatalogDocument::from_value(json!({
            "@graph": [
                {"identifier": "obj-1", "type": "Foto", "photo": [{"path": img}]},
                {"identifier": "obj-2", "type": "Brief", "photo": [{"path": img}, {"path": img}]},
                {"identifier": "obj-3", "type": "Foto"},
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn submit_appends_rows_and_tags_items() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = catalog_with_images(&dir).await;
        let service = SequentialService::new();

        let outcome = submit(&mut catalog, &SubmitOptions::default(), &config(), &service)
            .await
            .unwrap();

        // obj-1 one image, obj-2 two images, obj-3 no photos (skipped).
        assert_eq!(outcome.submitted_images, 3);
        assert_eq!(outcome.selected_records, 3);
        assert_eq!(outcome.skipped, vec![SkipReason::NoPhotos { id: "obj-3".into() }]);

        let rows: Vec<_> = outcome
            .ledger
            .iter()
            .map(|e| (e.item_id.clone(), e.photo_index))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("obj-1".to_string(), 0),
                ("obj-2".to_string(), 0),
                ("obj-2".to_string(), 1),
            ]
        );

        // Every attempted item carries the sentinel, photos or not.
        for node in catalog.records() {
            assert!(record::node_has_tag(node, "atr_processed"));
        }
    }

    #[tokio::test]
    async fn resubmission_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = catalog_with_images(&dir).await;
        let service = SequentialService::new();

        submit(&mut catalog, &SubmitOptions::default(), &config(), &service)
            .await
            .unwrap();
        let before = catalog.clone();

        let second = submit(&mut catalog, &SubmitOptions::default(), &config(), &service)
            .await
            .unwrap();
        assert_eq!(second.selected_records, 0);
        assert!(second.ledger.is_empty());
        assert_eq!(catalog, before, "re-run must not touch the document");
    }

    #[tokio::test]
    async fn explicit_photo_index_out_of_range_skips_image_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = catalog_with_images(&dir).await;
        let service = SequentialService::new();

        let options = SubmitOptions {
            photo_index: Some(1),
            ..Default::default()
        };
        let outcome = submit(&mut catalog, &options, &config(), &service)
            .await
            .unwrap();

        // Only obj-2 has a photo 1; obj-1 skips the image, obj-3 the item.
        assert_eq!(outcome.submitted_images, 1);
        assert_eq!(outcome.ledger.get("obj-2").unwrap().photo_index, 1);
        assert!(outcome
            .skipped
            .contains(&SkipReason::PhotoIndexOutOfRange { id: "obj-1".into(), index: 1 }));
    }

    #[tokio::test]
    async fn type_filter_restricts_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = catalog_with_images(&dir).await;
        let service = SequentialService::new();

        let options = SubmitOptions {
            item_type: Some("Brief".into()),
            ..Default::default()
        };
        let outcome = submit(&mut catalog, &options, &config(), &service)
            .await
            .unwrap();

        assert_eq!(outcome.selected_records, 1);
        assert_eq!(outcome.submitted_images, 2);
        // Unselected items stay untagged.
        assert!(!record::node_has_tag(&catalog.records()[0], "atr_processed"));
        assert!(record::node_has_tag(&catalog.records()[1], "atr_processed"));
    }

    #[tokio::test]
    async fn missing_common_dir_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = catalog_with_images(&dir).await;
        let service = SequentialService::new();

        let options = SubmitOptions {
            lowest_common_dir: Some("/definitely/not/a/dir".into()),
            ..Default::default()
        };
        let err = submit(&mut catalog, &options, &config(), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::DirectoryNotFound { .. }));
    }

    #[test]
    fn inspect_summarises() {
        let catalog = CatalogDocument::from_value(json!({
            "@graph": [
                {"identifier": "a", "type": "Foto"},
                {"identifier": "b", "type": "Brief"},
                {"identifier": "c", "type": "Foto"},
            ]
        }))
        .unwrap();
        let summary = inspect(&catalog);
        assert_eq!(summary.records, 3);
        assert_eq!(
            summary.types.into_iter().collect::<Vec<_>>(),
            vec!["Brief".to_string(), "Foto".to_string()]
        );
    }
}
