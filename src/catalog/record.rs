//! Item model: a typed view over one catalog record.
//!
//! A Tropy export is JSON-LD; items carry a fixed set of Dublin-Core-ish
//! metadata fields plus anything a project template adds. [`Record`] names
//! the known fields and funnels everything else into a flattened extension
//! bag so parse → serialize round-trips never drop project-specific keys.
//!
//! ## Views vs. nodes
//!
//! `Record` is a read view, parsed per iteration from a raw `@graph` node
//! and then discarded. All writes — the sentinel tag, synthesized note and
//! selection elements — go directly to the raw node via the `add_tag` /
//! `append_photo_note` / `append_photo_selection` helpers, so untouched
//! parts of the node are never re-serialized through the typed view.

use crate::catalog::coords::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Default Tropy item template.
pub const ITEM_TEMPLATE: &str = "https://tropy.org/v1/templates/id#iTbU0YBP";

/// Template identifying a photo selection element.
pub const SELECTION_TEMPLATE: &str = "https://tropy.org/v1/templates/selection";

/// One photo attached to an item, addressed by its position in the item's
/// photo list. The position is the join key used throughout the pipeline;
/// photos have no stable name of their own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    /// Image path as recorded on the authoring machine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Vec<Value>>,

    /// Everything else on the photo node (checksum, mimetype, rotation, …).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A typed view of one catalog item.
///
/// Field naming follows the Tropy export vocabulary rather than Rust
/// convention where the two differ (`hasPart`, `isPartOf`). Metadata fields
/// the pipeline never interprets are kept as raw [`Value`]s — templates are
/// free to put strings or structured values there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Value>,

    #[serde(rename = "dcterms:creator", skip_serializing_if = "Option::is_none")]
    pub dcterms_creator: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Value>,

    #[serde(rename = "dcterms:date", skip_serializing_if = "Option::is_none")]
    pub dcterms_date: Option<Value>,

    /// Item type, matched exactly by the submission filter.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<Value>,

    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub box_: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,

    /// Unique key of the item within one export; the ledger join key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<Value>,

    #[serde(rename = "hasPart", skip_serializing_if = "Option::is_none")]
    pub has_part: Option<Value>,

    #[serde(rename = "isPartOf", skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<Value>,

    #[serde(rename = "isRelatedTo", skip_serializing_if = "Option::is_none")]
    pub is_related_to: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<Photo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Vec<Value>>,

    /// Open extension bag: attributes outside the known set, preserved
    /// verbatim through parse/serialize.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Parse a raw `@graph` node into a typed view.
    pub fn from_node(node: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(node.clone())
    }

    /// Serialize the view back into a node.
    ///
    /// The pipeline itself mutates raw nodes in place and never calls this
    /// on its hot path; it exists for callers that build or copy items.
    pub fn to_node(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Whether the item carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }

    /// The item's photos, empty when the photo field is absent.
    pub fn photos(&self) -> &[Photo] {
        self.photo.as_deref().unwrap_or_default()
    }
}

// ── Raw-node mutation ────────────────────────────────────────────────────

/// Append `tag` to the node's tag list, creating the list if absent.
pub fn add_tag(node: &mut Value, tag: &str) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    match obj.get_mut("tag") {
        Some(Value::Array(tags)) => tags.push(Value::String(tag.to_string())),
        _ => {
            obj.insert("tag".to_string(), json!([tag]));
        }
    }
}

/// Whether the raw node carries the given tag.
pub fn node_has_tag(node: &Value, tag: &str) -> bool {
    node.get("tag")
        .and_then(Value::as_array)
        .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(tag)))
}

/// Append a note element to the photo at `index`, creating the note list if
/// absent. Returns `false` when the node has no such photo.
pub fn append_photo_note(node: &mut Value, index: usize, note: Value) -> bool {
    append_photo_element(node, index, "note", note)
}

/// Append a selection element to the photo at `index`, creating the
/// selection list if absent. Returns `false` when the node has no such photo.
pub fn append_photo_selection(node: &mut Value, index: usize, selection: Value) -> bool {
    append_photo_element(node, index, "selection", selection)
}

fn append_photo_element(node: &mut Value, index: usize, key: &str, element: Value) -> bool {
    let Some(photo) = node
        .get_mut("photo")
        .and_then(Value::as_array_mut)
        .and_then(|photos| photos.get_mut(index))
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    match photo.get_mut(key) {
        Some(Value::Array(elements)) => elements.push(element),
        _ => {
            photo.insert(key.to_string(), Value::Array(vec![element]));
        }
    }
    true
}

// ── Element builders ─────────────────────────────────────────────────────

/// Build a note element in the shape the Tropy importer accepts.
pub fn note_element(text: &str, language: &str) -> Value {
    json!({
        "@type": "Note",
        "text": {
            "@value": text,
            "@language": language,
        },
        "html": {
            "@value": format!("<p>{text}</p>"),
            "@language": language,
        },
    })
}

/// Build a selection element anchoring one transcribed line to a bounding
/// box, with neutral cosmetic defaults and the line's text as a nested note.
pub fn selection_element(text: &str, bounds: BoundingBox, language: &str) -> Value {
    json!({
        "@type": "Selection",
        "template": SELECTION_TEMPLATE,
        "x": bounds.x,
        "y": bounds.y,
        "angle": 0,
        "brightness": 0,
        "contrast": 0,
        "height": bounds.height,
        "hue": 0,
        "mirror": false,
        "negative": false,
        "saturation": 0,
        "sharpen": 0,
        "width": bounds.width,
        "title": {
            "@type": "text",
            "@value": text,
        },
        "note": [note_element(text, language)],
    })
}
