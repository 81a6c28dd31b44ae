//! Coordinate translation from recognition polygons to selection boxes.
//!
//! The recognition service describes a text line as a polygon — a
//! whitespace-separated list of `"x,y"` vertices with the origin at the
//! image's top-left corner and y growing downward. Tropy selections are
//! axis-aligned rectangles in the same orientation, so no axis flip is
//! applied; the translation is the minimal bounding box of the vertices.

use thiserror::Error;

/// A polygon string that could not be parsed as `"x,y x,y …"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed polygon points '{points}'")]
pub struct MalformedPoints {
    pub points: String,
}

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Compute the minimal axis-aligned bounding box of a polygon string.
///
/// Width and height are always ≥ 0; a single-vertex polygon yields a
/// zero-sized box anchored at that vertex.
///
/// # Example
/// ```rust
/// use tropy_atr::catalog::coords::polygon_bounds;
///
/// let b = polygon_bounds("192,458 192,514 332,514 332,458").unwrap();
/// assert_eq!((b.x, b.y, b.width, b.height), (192, 458, 140, 56));
/// ```
pub fn polygon_bounds(points: &str) -> Result<BoundingBox, MalformedPoints> {
    let malformed = || MalformedPoints {
        points: points.to_string(),
    };

    let mut min_x = i64::MAX;
    let mut max_x = i64::MIN;
    let mut min_y = i64::MAX;
    let mut max_y = i64::MIN;
    let mut vertices = 0usize;

    for pair in points.split_whitespace() {
        let (x, y) = pair.split_once(',').ok_or_else(malformed)?;
        let x: i64 = x.trim().parse().map_err(|_| malformed())?;
        let y: i64 = y.trim().parse().map_err(|_| malformed())?;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
        vertices += 1;
    }

    if vertices == 0 {
        return Err(malformed());
    }

    Ok(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}
