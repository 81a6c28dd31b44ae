//! Catalog data model: the export document, the item view, and the
//! coordinate translation used when anchoring transcribed lines.
//!
//! The durable entity is always the raw JSON node inside
//! [`CatalogDocument`]; [`Record`] and [`Photo`] are transient parsed views
//! constructed per iteration. See [`record`] for the view/node split.

pub mod coords;
pub mod document;
pub mod record;

pub use coords::{polygon_bounds, BoundingBox};
pub use document::CatalogDocument;
pub use record::{Photo, Record};
