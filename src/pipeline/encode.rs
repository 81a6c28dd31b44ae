//! Image encoding: file bytes → base64 for the submission request body.
//!
//! The processing API accepts images as base64 embedded in the JSON
//! request, so the bytes are sent exactly as they sit on disk — no
//! re-encoding, no resizing. Whatever format the catalog's photos are in
//! is what the recognition models see.

use crate::error::EnrichError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Read an image file and encode it for submission.
pub async fn encode_image(path: &Path) -> Result<String, EnrichError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| EnrichError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded '{}' → {} bytes base64", path.display(), b64.len());
    Ok(b64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.jpg");
        tokio::fs::write(&path, b"\xff\xd8\xff\xe0fake-jpeg").await.unwrap();

        let b64 = encode_image(&path).await.unwrap();
        assert_eq!(STANDARD.decode(&b64).unwrap(), b"\xff\xd8\xff\xe0fake-jpeg");
    }

    #[tokio::test]
    async fn missing_file_is_an_image_read_error() {
        let err = encode_image(Path::new("/no/such/image.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::ImageRead { .. }));
    }
}
