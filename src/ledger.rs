//! The correlation ledger: durable bookkeeping between pipeline runs.
//!
//! Submission and result retrieval are separate runs, possibly hours apart
//! and possibly on different machines — recognition jobs take up to the
//! service's SLA window to complete. The ledger file is the only state the
//! runs share; there is no in-process handoff.
//!
//! Two persisted forms exist:
//!
//! * after **submission** — a CSV table, header `item_id,photo_index,
//!   process_id`, one row per submitted image, in document order;
//! * after **download** — a JSON document keyed by item identifier, each
//!   value the triple `[photo_index, process_id, payload]`.
//!
//! Persistence sits behind [`LedgerStore`] so the backing store can be
//! swapped (flat files, an embedded database) without touching pipeline
//! logic. [`FileLedgerStore`] is the flat-file implementation.
//!
//! Lookups are keyed by item identifier. An item with several photos
//! occupies one row per photo; on keyed lookup the last row wins, matching
//! the keyed JSON form where later rows overwrite earlier ones.

use crate::error::EnrichError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CSV header of the submission-phase ledger.
const CSV_HEADER: &str = "item_id,photo_index,process_id";

/// One submitted image: which item, which photo, which recognition job.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Identifier of the catalog item.
    pub item_id: String,
    /// Position of the photo within the item's photo list.
    pub photo_index: usize,
    /// Job identifier returned by the recognition service.
    pub process_id: String,
    /// Raw result payload, attached by the download phase.
    pub result: Option<Value>,
}

impl LedgerEntry {
    pub fn new(
        item_id: impl Into<String>,
        photo_index: usize,
        process_id: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            photo_index,
            process_id: process_id.into(),
            result: None,
        }
    }
}

/// An ordered list of ledger entries.
///
/// Order is the submission order (document order of the catalog), which
/// keeps ledger output deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LedgerEntry> {
        self.entries.iter_mut()
    }

    /// Look up the entry for an item identifier. Last row wins when the
    /// identifier occupies several rows.
    pub fn get(&self, item_id: &str) -> Option<&LedgerEntry> {
        self.entries.iter().rev().find(|e| e.item_id == item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keyed JSON form: `{item_id: [photo_index, process_id, payload]}`.
    ///
    /// Duplicate identifiers collapse onto one key, last row's value at the
    /// first row's position.
    pub fn to_keyed_json(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.entries {
            let triple = Value::Array(vec![
                Value::from(entry.photo_index as u64),
                Value::String(entry.process_id.clone()),
                entry.result.clone().unwrap_or(Value::Null),
            ]);
            map.insert(entry.item_id.clone(), triple);
        }
        Value::Object(map)
    }
}

impl FromIterator<LedgerEntry> for Ledger {
    fn from_iter<I: IntoIterator<Item = LedgerEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── Persistence interface ────────────────────────────────────────────────

/// Key-value persistence for the ledger.
///
/// The pipeline only ever talks to this trait; [`FileLedgerStore`] is the
/// default flat-file backing.
pub trait LedgerStore: Send + Sync {
    /// Persist the submission-phase ledger (payloads are not written).
    fn save_submissions(&self, ledger: &Ledger) -> Result<(), EnrichError>;

    /// Reload the submission-phase ledger.
    fn load_submissions(&self) -> Result<Ledger, EnrichError>;

    /// Persist the augmented ledger including result payloads.
    fn save_results(&self, ledger: &Ledger) -> Result<(), EnrichError>;

    /// Reload the augmented ledger.
    fn load_results(&self) -> Result<Ledger, EnrichError>;
}

/// Flat-file ledger store: CSV for submissions, JSON for results.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    csv_path: PathBuf,
    json_path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(csv_path: impl Into<PathBuf>, json_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_path: json_path.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }
}

impl LedgerStore for FileLedgerStore {
    fn save_submissions(&self, ledger: &Ledger) -> Result<(), EnrichError> {
        let mut out = String::with_capacity(64 * (ledger.len() + 1));
        out.push_str(CSV_HEADER);
        out.push('\n');
        for entry in ledger.iter() {
            out.push_str(&csv_field(&entry.item_id));
            out.push(',');
            out.push_str(&entry.photo_index.to_string());
            out.push(',');
            out.push_str(&csv_field(&entry.process_id));
            out.push('\n');
        }
        std::fs::write(&self.csv_path, out).map_err(|source| EnrichError::OutputWrite {
            path: self.csv_path.clone(),
            source,
        })?;
        info!(
            "Saved {} ledger rows to '{}'",
            ledger.len(),
            self.csv_path.display()
        );
        Ok(())
    }

    fn load_submissions(&self) -> Result<Ledger, EnrichError> {
        let text = read_ledger_file(&self.csv_path)?;
        let parse_err = |detail: String| EnrichError::LedgerParse {
            path: self.csv_path.clone(),
            detail,
        };

        let mut lines = text.lines();
        match lines.next() {
            Some(header) if header.trim_end() == CSV_HEADER => {}
            other => {
                return Err(parse_err(format!(
                    "expected header '{CSV_HEADER}', got {other:?}"
                )))
            }
        }

        let mut ledger = Ledger::new();
        for (lineno, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields = parse_csv_row(line)
                .map_err(|detail| parse_err(format!("row {}: {detail}", lineno + 2)))?;
            let [item_id, photo_index, process_id]: [String; 3] =
                fields.try_into().map_err(|fields: Vec<String>| {
                    parse_err(format!(
                        "row {}: expected 3 fields, got {}",
                        lineno + 2,
                        fields.len()
                    ))
                })?;
            let photo_index: usize = photo_index.trim().parse().map_err(|_| {
                parse_err(format!(
                    "row {}: photo_index '{photo_index}' is not a number",
                    lineno + 2
                ))
            })?;
            ledger.push(LedgerEntry::new(item_id, photo_index, process_id));
        }
        debug!(
            "Loaded {} ledger rows from '{}'",
            ledger.len(),
            self.csv_path.display()
        );
        Ok(ledger)
    }

    fn save_results(&self, ledger: &Ledger) -> Result<(), EnrichError> {
        let json = serde_json::to_vec_pretty(&ledger.to_keyed_json())
            .map_err(|e| EnrichError::Internal(format!("ledger serialization failed: {e}")))?;
        std::fs::write(&self.json_path, json).map_err(|source| EnrichError::OutputWrite {
            path: self.json_path.clone(),
            source,
        })?;
        info!(
            "Saved {} downloaded results to '{}'",
            ledger.len(),
            self.json_path.display()
        );
        Ok(())
    }

    fn load_results(&self) -> Result<Ledger, EnrichError> {
        let text = read_ledger_file(&self.json_path)?;
        let parse_err = |detail: String| EnrichError::LedgerParse {
            path: self.json_path.clone(),
            detail,
        };

        let root: Value =
            serde_json::from_str(&text).map_err(|e| parse_err(format!("invalid JSON: {e}")))?;
        let map = root
            .as_object()
            .ok_or_else(|| parse_err("expected a JSON object keyed by item id".into()))?;

        let mut ledger = Ledger::new();
        for (item_id, triple) in map {
            let fields = triple
                .as_array()
                .filter(|a| a.len() >= 2)
                .ok_or_else(|| {
                    parse_err(format!(
                        "entry '{item_id}': expected [photo_index, process_id, payload]"
                    ))
                })?;

            // The index may be a number or, in ledgers written by older
            // tooling, a numeric string.
            let photo_index = match &fields[0] {
                Value::Number(n) => n.as_u64().map(|n| n as usize),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                parse_err(format!(
                    "entry '{item_id}': photo_index {} is not a valid index",
                    fields[0]
                ))
            })?;

            let process_id = match &fields[1] {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(parse_err(format!(
                        "entry '{item_id}': process_id {other} is not a string or number"
                    )))
                }
            };

            let mut entry = LedgerEntry::new(item_id.clone(), photo_index, process_id);
            entry.result = match fields.get(2) {
                None | Some(Value::Null) => None,
                Some(payload) => Some(payload.clone()),
            };
            ledger.push(entry);
        }
        debug!(
            "Loaded {} downloaded results from '{}'",
            ledger.len(),
            self.json_path.display()
        );
        Ok(ledger)
    }
}

fn read_ledger_file(path: &Path) -> Result<String, EnrichError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EnrichError::LedgerNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EnrichError::Internal(format!("failed to read '{}': {e}", path.display()))
        }
    })
}

// ── Minimal CSV ──────────────────────────────────────────────────────────
//
// Three fixed columns. Item identifiers are free-form catalog data, so
// fields containing commas or quotes must be quoted RFC-4180 style.

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn parse_csv_row(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if current.is_empty() && !quoted => quoted = true,
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            ',' if !quoted => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if quoted {
        return Err("unterminated quoted field".into());
    }
    fields.push(current);
    Ok(fields)
}
