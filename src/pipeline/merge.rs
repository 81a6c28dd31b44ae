//! Merge: write downloaded transcriptions back into the catalog.
//!
//! For each item that went through submission, the payload stored in the
//! ledger is translated into catalog-native elements on the photo that was
//! submitted: one note with the full transcription, and — when line detail
//! is requested — one selection per recognised line, anchored to the
//! line's bounding box.
//!
//! The payload is validated **before** any node mutation. A record is
//! either fully enriched or untouched; skip conditions can never leave a
//! half-written photo behind.

use crate::catalog::coords::{polygon_bounds, BoundingBox};
use crate::catalog::record::{append_photo_note, append_photo_selection, note_element, selection_element};
use crate::config::EnrichConfig;
use crate::error::SkipReason;
use crate::ledger::LedgerEntry;
use serde_json::Value;

/// A validated result payload, reduced to what the merge writes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Transcription {
    /// Full transcribed text of the image.
    pub text: String,
    /// Per-line detail, flattened across regions in payload order.
    pub lines: Vec<TranscribedLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TranscribedLine {
    pub text: String,
    pub bounds: BoundingBox,
}

/// Validate a raw result payload.
///
/// `content.text` and `content.regions` must both be present — the service
/// writes them together, and their absence means the job failed or the
/// payload is from something else entirely. Line detail is only parsed
/// when requested.
pub(crate) fn parse_payload(
    item_id: &str,
    payload: &Value,
    want_lines: bool,
) -> Result<Transcription, SkipReason> {
    let shape = |field: &str| SkipReason::PayloadShape {
        id: item_id.to_string(),
        field: field.to_string(),
    };

    let text = payload
        .pointer("/content/text")
        .and_then(Value::as_str)
        .ok_or_else(|| shape("content.text"))?;

    if text.is_empty() {
        return Err(SkipReason::EmptyTranscription {
            id: item_id.to_string(),
        });
    }

    let regions = payload
        .pointer("/content/regions")
        .and_then(Value::as_array)
        .ok_or_else(|| shape("content.regions"))?;

    let mut lines = Vec::new();
    if want_lines {
        for region in regions {
            let region_lines = region
                .get("lines")
                .and_then(Value::as_array)
                .ok_or_else(|| shape("regions[].lines"))?;
            for line in region_lines {
                let line_text = line
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape("lines[].text"))?;
                let points = line
                    .pointer("/coords/points")
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape("lines[].coords.points"))?;
                let bounds =
                    polygon_bounds(points).map_err(|_| shape("lines[].coords.points"))?;
                lines.push(TranscribedLine {
                    text: line_text.to_string(),
                    bounds,
                });
            }
        }
    }

    Ok(Transcription {
        text: text.to_string(),
        lines,
    })
}

/// Enrich one raw record node from its ledger entry.
///
/// Returns the number of selection elements added. On `Err` the node is
/// guaranteed untouched.
pub(crate) fn enrich_node(
    node: &mut Value,
    item_id: &str,
    entry: &LedgerEntry,
    want_lines: bool,
    config: &EnrichConfig,
) -> Result<usize, SkipReason> {
    let payload = entry.result.as_ref().ok_or_else(|| SkipReason::NoResult {
        id: item_id.to_string(),
    })?;

    let transcription = parse_payload(item_id, payload, want_lines)?;
    let index = entry.photo_index;

    // First mutation; refusal means the photo does not exist and nothing
    // has been written yet.
    if !append_photo_note(
        node,
        index,
        note_element(&transcription.text, &config.language),
    ) {
        return Err(SkipReason::PhotoIndexOutOfRange {
            id: item_id.to_string(),
            index,
        });
    }

    for line in &transcription.lines {
        append_photo_selection(
            node,
            index,
            selection_element(&line.text, line.bounds, &config.language),
        );
    }

    Ok(transcription.lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerEntry;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "status": "FINISHED",
            "content": {
                "text": "erste Zeile\nzweite Zeile",
                "regions": [
                    {
                        "lines": [
                            {"text": "erste Zeile", "coords": {"points": "192,458 192,514 332,514 332,458"}},
                        ]
                    },
                    {
                        "lines": [
                            {"text": "zweite Zeile", "coords": {"points": "10,10"}},
                        ]
                    }
                ]
            }
        })
    }

    fn node() -> Value {
        json!({
            "identifier": "obj-1",
            "tag": ["atr_processed"],
            "photo": [{"path": "a.jpg"}],
        })
    }

    fn entry(result: Option<Value>) -> LedgerEntry {
        let mut e = LedgerEntry::new("obj-1", 0, "91001");
        e.result = result;
        e
    }

    fn config() -> EnrichConfig {
        EnrichConfig::default()
    }

    #[test]
    fn parse_full_payload_with_lines() {
        let t = parse_payload("obj-1", &payload(), true).unwrap();
        assert_eq!(t.text, "erste Zeile\nzweite Zeile");
        assert_eq!(t.lines.len(), 2);
        assert_eq!(t.lines[0].text, "erste Zeile");
        assert_eq!(
            (t.lines[0].bounds.x, t.lines[0].bounds.y),
            (192, 458)
        );
        assert_eq!(t.lines[1].bounds.width, 0);
    }

    #[test]
    fn parse_without_lines_skips_line_detail() {
        let t = parse_payload("obj-1", &payload(), false).unwrap();
        assert!(t.lines.is_empty());
    }

    #[test]
    fn missing_text_is_payload_shape() {
        let err = parse_payload("obj-1", &json!({"content": {}}), false).unwrap_err();
        assert!(matches!(err, SkipReason::PayloadShape { ref field, .. } if field == "content.text"));
    }

    #[test]
    fn missing_regions_is_payload_shape_even_without_lines() {
        let err =
            parse_payload("obj-1", &json!({"content": {"text": "t"}}), false).unwrap_err();
        assert!(matches!(err, SkipReason::PayloadShape { ref field, .. } if field == "content.regions"));
    }

    #[test]
    fn empty_text_is_its_own_condition() {
        let err = parse_payload(
            "obj-1",
            &json!({"content": {"text": "", "regions": []}}),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SkipReason::EmptyTranscription { .. }));
    }

    #[test]
    fn malformed_points_is_payload_shape() {
        let bad = json!({
            "content": {
                "text": "t",
                "regions": [{"lines": [{"text": "l", "coords": {"points": "not points"}}]}]
            }
        });
        let err = parse_payload("obj-1", &bad, true).unwrap_err();
        assert!(matches!(err, SkipReason::PayloadShape { ref field, .. } if field == "lines[].coords.points"));
    }

    #[test]
    fn enrich_adds_note_and_selections_in_order() {
        let mut n = node();
        let added = enrich_node(&mut n, "obj-1", &entry(Some(payload())), true, &config()).unwrap();
        assert_eq!(added, 2);

        let notes = n["photo"][0]["note"].as_array().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["text"]["@value"], "erste Zeile\nzweite Zeile");

        let selections = n["photo"][0]["selection"].as_array().unwrap();
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0]["note"][0]["text"]["@value"], "erste Zeile");
        assert_eq!(selections[1]["note"][0]["text"]["@value"], "zweite Zeile");
        assert_eq!(selections[0]["x"], 192);
        assert_eq!(selections[1]["x"], 10);
    }

    #[test]
    fn skip_conditions_leave_node_untouched() {
        let before = node();

        let mut n = node();
        let err = enrich_node(&mut n, "obj-1", &entry(None), true, &config()).unwrap_err();
        assert!(matches!(err, SkipReason::NoResult { .. }));
        assert_eq!(n, before);

        let empty = json!({"content": {"text": "", "regions": []}});
        let mut n = node();
        let err = enrich_node(&mut n, "obj-1", &entry(Some(empty)), true, &config()).unwrap_err();
        assert!(matches!(err, SkipReason::EmptyTranscription { .. }));
        assert_eq!(n, before);

        // Payload points at a photo the item does not have.
        let mut e = entry(Some(payload()));
        e.photo_index = 7;
        let mut n = node();
        let err = enrich_node(&mut n, "obj-1", &e, true, &config()).unwrap_err();
        assert!(matches!(err, SkipReason::PhotoIndexOutOfRange { index: 7, .. }));
        assert_eq!(n, before);
    }
}
