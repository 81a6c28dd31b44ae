//! Item selection: which records are eligible for submission.
//!
//! Filters are conjunctive — an item must match the type filter (if any)
//! AND carry the filter tag (if any) AND not carry the sentinel tag. The
//! sentinel check is the pipeline's idempotence guard: re-running the
//! submission phase against an already-enriched export selects nothing.
//!
//! Selection never reorders; the output is a subsequence of the input in
//! document order, which keeps the resulting ledger deterministic.

use crate::catalog::Record;

/// Optional submission filters.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Exact match against the item's type field.
    pub item_type: Option<String>,
    /// The item must carry this tag.
    pub tag: Option<String>,
}

/// Why an item was passed over, where it matters to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Type or tag filter did not match. Not worth a diagnostic.
    FilteredOut,
    /// The item already carries the sentinel tag.
    AlreadyProcessed,
}

/// Classify one item against the filters and the sentinel tag.
pub fn eligibility(record: &Record, filter: &RecordFilter, processed_tag: &str) -> Eligibility {
    if let Some(wanted) = filter.item_type.as_deref() {
        if record.item_type.as_deref() != Some(wanted) {
            return Eligibility::FilteredOut;
        }
    }
    if let Some(tag) = filter.tag.as_deref() {
        if !record.has_tag(tag) {
            return Eligibility::FilteredOut;
        }
    }
    if record.has_tag(processed_tag) {
        return Eligibility::AlreadyProcessed;
    }
    Eligibility::Eligible
}

/// The ordered subsequence of eligible records.
pub fn select<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    filter: &RecordFilter,
    processed_tag: &str,
) -> Vec<&'a Record> {
    records
        .into_iter()
        .filter(|r| eligibility(r, filter, processed_tag) == Eligibility::Eligible)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, item_type: Option<&str>, tags: &[&str]) -> Record {
        let mut node = json!({"identifier": id});
        if let Some(t) = item_type {
            node["type"] = json!(t);
        }
        if !tags.is_empty() {
            node["tag"] = json!(tags);
        }
        Record::from_node(&node).unwrap()
    }

    const SENTINEL: &str = "atr_processed";

    #[test]
    fn no_filters_selects_untagged() {
        let records = vec![
            record("a", Some("Foto"), &[]),
            record("b", None, &[SENTINEL]),
            record("c", Some("Brief"), &["keep"]),
        ];
        let selected = select(&records, &RecordFilter::default(), SENTINEL);
        let ids: Vec<_> = selected.iter().map(|r| r.identifier.as_deref()).collect();
        assert_eq!(ids, vec![Some("a"), Some("c")]);
    }

    #[test]
    fn type_filter_is_exact() {
        let records = vec![
            record("a", Some("Foto"), &[]),
            record("b", Some("Fotografie"), &[]),
            record("c", None, &[]),
        ];
        let filter = RecordFilter {
            item_type: Some("Foto".into()),
            ..Default::default()
        };
        let selected = select(&records, &filter, SENTINEL);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].identifier.as_deref(), Some("a"));
    }

    #[test]
    fn tag_filter_requires_membership() {
        let records = vec![
            record("a", None, &["selected", "other"]),
            record("b", None, &["other"]),
            record("c", None, &[]),
        ];
        let filter = RecordFilter {
            tag: Some("selected".into()),
            ..Default::default()
        };
        let selected = select(&records, &filter, SENTINEL);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].identifier.as_deref(), Some("a"));
    }

    #[test]
    fn filters_are_conjunctive() {
        let records = vec![
            record("a", Some("Foto"), &["selected"]),
            record("b", Some("Foto"), &[]),
            record("c", Some("Brief"), &["selected"]),
        ];
        let filter = RecordFilter {
            item_type: Some("Foto".into()),
            tag: Some("selected".into()),
        };
        let selected = select(&records, &filter, SENTINEL);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].identifier.as_deref(), Some("a"));
    }

    #[test]
    fn sentinel_wins_over_matching_filters() {
        let records = vec![record("a", Some("Foto"), &["selected", SENTINEL])];
        let filter = RecordFilter {
            item_type: Some("Foto".into()),
            tag: Some("selected".into()),
        };
        assert!(select(&records, &filter, SENTINEL).is_empty());
        assert_eq!(
            eligibility(&records[0], &filter, SENTINEL),
            Eligibility::AlreadyProcessed
        );
    }

    #[test]
    fn order_is_preserved() {
        let records: Vec<_> = (0..5)
            .map(|i| record(&format!("obj-{i}"), Some("Foto"), &[]))
            .collect();
        let selected = select(&records, &RecordFilter::default(), SENTINEL);
        let ids: Vec<_> = selected
            .iter()
            .map(|r| r.identifier.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["obj-0", "obj-1", "obj-2", "obj-3", "obj-4"]);
    }
}
