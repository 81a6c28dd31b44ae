//! The catalog export document.
//!
//! A Tropy export is one JSON-LD object whose `@graph` array holds the item
//! nodes in display order. [`CatalogDocument`] owns that object verbatim:
//! items are parsed into [`crate::catalog::Record`] views on demand, while
//! every mutation targets the raw node so unknown structure — `@context`,
//! project keys, field order — passes through a load/save cycle unchanged.
//!
//! Saving is atomic (temp file + rename): the pipeline writes the document
//! exactly once per run, and a crash mid-write must not leave a truncated
//! export behind.

use crate::error::EnrichError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const GRAPH_KEY: &str = "@graph";

/// An in-memory catalog export.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogDocument {
    root: Value,
}

impl CatalogDocument {
    /// Wrap an already-parsed export object.
    ///
    /// Fails when the object has no `@graph` array.
    pub fn from_value(root: Value) -> Result<Self, EnrichError> {
        if root.get(GRAPH_KEY).and_then(Value::as_array).is_none() {
            return Err(EnrichError::CatalogShape {
                path: PathBuf::from("<in-memory>"),
            });
        }
        Ok(Self { root })
    }

    /// Load an export from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EnrichError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EnrichError::CatalogNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                EnrichError::Internal(format!("failed to read '{}': {e}", path.display()))
            }
        })?;

        let root: Value =
            serde_json::from_slice(&bytes).map_err(|source| EnrichError::CatalogParse {
                path: path.to_path_buf(),
                source,
            })?;

        if root.get(GRAPH_KEY).and_then(Value::as_array).is_none() {
            return Err(EnrichError::CatalogShape {
                path: path.to_path_buf(),
            });
        }

        let doc = Self { root };
        debug!("Loaded catalog '{}': {} items", path.display(), doc.len());
        Ok(doc)
    }

    /// Write the export to disk, atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), EnrichError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| EnrichError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_vec_pretty(&self.root)
            .map_err(|e| EnrichError::Internal(format!("catalog serialization failed: {e}")))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

        info!("Saved catalog to '{}'", path.display());
        Ok(())
    }

    /// The item nodes, in display order.
    pub fn records(&self) -> &[Value] {
        self.root
            .get(GRAPH_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mutable access to the item nodes.
    pub fn records_mut(&mut self) -> &mut [Value] {
        self.root
            .get_mut(GRAPH_KEY)
            .and_then(Value::as_array_mut)
            .map(Vec::as_mut_slice)
            .unwrap_or(&mut [])
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Deduplicated values of the items' type fields.
    pub fn types(&self) -> BTreeSet<String> {
        self.records()
            .iter()
            .filter_map(|node| node.get("type").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// The underlying export object.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export() -> Value {
        json!({
            "@context": {"@vocab": "https://tropy.org/v1/tropy#"},
            "@graph": [
                {"identifier": "obj-1", "type": "Foto"},
                {"identifier": "obj-2", "type": "Brief"},
                {"identifier": "obj-3", "type": "Foto"},
                {"identifier": "obj-4"},
            ],
            "version": "1.15.2",
        })
    }

    #[test]
    fn from_value_requires_graph() {
        assert!(CatalogDocument::from_value(json!({"@graph": []})).is_ok());
        assert!(matches!(
            CatalogDocument::from_value(json!({"items": []})),
            Err(EnrichError::CatalogShape { .. })
        ));
        assert!(matches!(
            CatalogDocument::from_value(json!({"@graph": "nope"})),
            Err(EnrichError::CatalogShape { .. })
        ));
    }

    #[test]
    fn types_deduplicates_and_skips_untyped() {
        let doc = CatalogDocument::from_value(export()).unwrap();
        let types: Vec<_> = doc.types().into_iter().collect();
        assert_eq!(types, vec!["Brief".to_string(), "Foto".to_string()]);
    }

    #[test]
    fn records_are_ordered() {
        let doc = CatalogDocument::from_value(export()).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.records()[1]["identifier"], "obj-2");
    }

    #[tokio::test]
    async fn load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        tokio::fs::write(&path, serde_json::to_vec(&export()).unwrap())
            .await
            .unwrap();

        let doc = CatalogDocument::load(&path).await.unwrap();
        let out = dir.path().join("export_updated.json");
        doc.save(&out).await.unwrap();

        let reloaded = CatalogDocument::load(&out).await.unwrap();
        assert_eq!(doc, reloaded);
    }

    #[tokio::test]
    async fn load_missing_file() {
        let err = CatalogDocument::load("/definitely/not/here.json")
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::CatalogNotFound { .. }));
    }

    #[tokio::test]
    async fn load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let err = CatalogDocument::load(&path).await.unwrap_err();
        assert!(matches!(err, EnrichError::CatalogParse { .. }));
    }
}
