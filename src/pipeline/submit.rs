//! Submission: drive the recognition capability for each selected image.
//!
//! Each image of a selected item is resolved to a local path, loaded,
//! encoded and submitted; every successful submission appends one ledger
//! row. Failure classes follow the long-standing behaviour of this
//! pipeline:
//!
//! * requested photo index out of range — warn, skip that image, continue
//!   with the rest of the item;
//! * item has no photos at all — warn, skip the whole item;
//! * anything else (unreadable image, remap failure, service error after
//!   retries) — abort the entire run.

use crate::catalog::Record;
use crate::config::EnrichConfig;
use crate::error::{EnrichError, SkipReason};
use crate::ledger::{Ledger, LedgerEntry};
use crate::pipeline::{encode, repath, with_retry};
use crate::service::RecognitionService;
use std::path::Path;
use tracing::{info, warn};

/// Everything a submission needs besides the item itself.
pub(crate) struct SubmissionContext<'a> {
    pub config: &'a EnrichConfig,
    pub service: &'a dyn RecognitionService,
    pub line_model_id: u64,
    pub atr_model_id: u64,
    pub lowest_common_dir: Option<&'a str>,
}

/// Submit the selected photos of one item, appending ledger rows.
///
/// With an explicit `photo_index` only that photo is submitted; otherwise
/// every photo is, in order. Returns the number of images submitted;
/// non-fatal skips are pushed onto `skipped`.
pub(crate) async fn submit_record(
    ctx: &SubmissionContext<'_>,
    record: &Record,
    item_id: &str,
    photo_index: Option<usize>,
    ledger: &mut Ledger,
    skipped: &mut Vec<SkipReason>,
) -> Result<usize, EnrichError> {
    let photos = record.photos();
    if photos.is_empty() {
        warn!("Item {item_id} has no image!");
        skipped.push(SkipReason::NoPhotos {
            id: item_id.to_string(),
        });
        return Ok(0);
    }

    let indices: Vec<usize> = match photo_index {
        Some(index) => vec![index],
        None => (0..photos.len()).collect(),
    };

    let mut submitted = 0;
    for index in indices {
        if record.photos().get(index).is_none() {
            warn!("Item {item_id} has no image with index {index}!");
            skipped.push(SkipReason::PhotoIndexOutOfRange {
                id: item_id.to_string(),
                index,
            });
            continue;
        }
        let entry = submit_image(ctx, record, item_id, index).await?;
        ledger.push(entry);
        submitted += 1;
    }
    Ok(submitted)
}

/// Submit one image and return its ledger row.
///
/// The caller has already checked that `index` is in range.
async fn submit_image(
    ctx: &SubmissionContext<'_>,
    record: &Record,
    item_id: &str,
    index: usize,
) -> Result<LedgerEntry, EnrichError> {
    let photo = &record.photos()[index];
    let recorded_path = photo
        .path
        .as_deref()
        .ok_or_else(|| EnrichError::PhotoPathMissing {
            id: item_id.to_string(),
            index,
        })?;

    let image_path = match ctx.lowest_common_dir {
        Some(common_dir) => repath::remap(recorded_path, common_dir)?,
        None => recorded_path.to_string(),
    };

    let image_base64 = encode::encode_image(Path::new(&image_path)).await?;

    let process_id = with_retry(
        ctx.config,
        &format!("item {item_id} image {index}"),
        || {
            ctx.service
                .submit(ctx.line_model_id, ctx.atr_model_id, &image_base64)
        },
    )
    .await?;

    info!("Item {item_id} image {index} has process ID {process_id}.");
    Ok(LedgerEntry::new(item_id, index, process_id))
}
