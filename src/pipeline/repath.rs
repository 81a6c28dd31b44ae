//! Path remapping between authoring and executing machines.
//!
//! Catalog exports record absolute image paths from the machine that
//! created them. When the pipeline runs elsewhere, the operator names the
//! lowest directory the two machines share; the recorded path is spliced
//! onto it at the matching component:
//!
//! ```text
//! recorded:  C:\Users\X\proj\data\img1.jpg
//! common:    C:\Users\Y\proj
//!                         └─ anchor component "proj"
//! result:    C:\Users\Y\proj\data\img1.jpg
//! ```
//!
//! Paths are handled as component lists split on either separator, so a
//! Windows-recorded export can be remapped on a Unix machine and vice
//! versa. The output uses the common directory's separator style, since
//! that is the path that must resolve on the executing machine.

use crate::error::EnrichError;
use tracing::debug;

const SEPARATORS: [char; 2] = ['\\', '/'];

/// Translate a recorded image path via the lowest common directory.
///
/// Fails when the common directory's final component does not occur
/// anywhere in the recorded path.
pub fn remap(image_path: &str, lowest_common_dir: &str) -> Result<String, EnrichError> {
    let common_dir = lowest_common_dir.trim_end_matches(SEPARATORS);
    let separator = if common_dir.contains('\\') { "\\" } else { "/" };

    let common: Vec<&str> = common_dir.split(SEPARATORS).collect();
    let recorded: Vec<&str> = image_path.split(SEPARATORS).collect();

    let not_found = || EnrichError::RemapFailed {
        path: image_path.to_string(),
        anchor: common.last().copied().unwrap_or_default().to_string(),
    };

    let anchor = *common.last().filter(|c| !c.is_empty()).ok_or_else(not_found)?;
    let position = recorded
        .iter()
        .position(|component| *component == anchor)
        .ok_or_else(not_found)?;

    let mut components = common;
    components.extend_from_slice(&recorded[position + 1..]);
    let remapped = components.join(separator);
    debug!("Remapped '{image_path}' → '{remapped}'");
    Ok(remapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_to_windows() {
        assert_eq!(
            remap(r"C:\Users\X\proj\data\img1.jpg", r"C:\Users\Y\proj").unwrap(),
            r"C:\Users\Y\proj\data\img1.jpg"
        );
    }

    #[test]
    fn windows_to_unix() {
        assert_eq!(
            remap(r"C:\Users\X\proj\data\img1.jpg", "/home/y/proj").unwrap(),
            "/home/y/proj/data/img1.jpg"
        );
    }

    #[test]
    fn trailing_separator_on_common_dir() {
        assert_eq!(
            remap(r"C:\Users\X\proj\data\img1.jpg", r"C:\Users\Y\proj\").unwrap(),
            r"C:\Users\Y\proj\data\img1.jpg"
        );
    }

    #[test]
    fn anchor_matches_first_occurrence() {
        assert_eq!(
            remap(r"C:\data\archive\data\img.jpg", r"D:\mirror\data").unwrap(),
            r"D:\mirror\data\archive\data\img.jpg"
        );
    }

    #[test]
    fn missing_anchor_fails() {
        let err = remap(r"C:\Users\X\other\img.jpg", r"C:\Users\Y\proj").unwrap_err();
        assert!(matches!(err, EnrichError::RemapFailed { ref anchor, .. } if anchor == "proj"));
    }

    #[test]
    fn image_directly_under_common_dir() {
        assert_eq!(
            remap(r"C:\Users\X\proj\img1.jpg", "/mnt/share/proj").unwrap(),
            "/mnt/share/proj/img1.jpg"
        );
    }
}
