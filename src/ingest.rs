use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;
use tracing::debug;

use crate::error::EditError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Validates type and size, then decodes to RGBA at native resolution.
///
/// The MIME type is sniffed from the bytes; `mime_hint` is only consulted when
/// sniffing finds nothing.
pub fn decode_image(bytes: &[u8], mime_hint: Option<&str>) -> Result<RgbaImage, EditError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(EditError::InvalidInput(format!(
            "image is {} bytes, limit is {} bytes",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| mime_hint.map(|hint| hint.trim().to_ascii_lowercase()))
        .ok_or_else(|| EditError::InvalidInput("unrecognized file type".to_string()))?;
    if !mime.starts_with("image/") {
        return Err(EditError::InvalidInput(format!(
            "expected an image, got {}",
            mime
        )));
    }
    debug!("decoding {} ({} bytes)", mime, bytes.len());
    let image = image::load_from_memory(bytes)
        .map_err(|err| EditError::InvalidInput(format!("failed to decode image: {}", err)))?;
    Ok(image.to_rgba8())
}

pub fn load_image_file(path: &Path) -> Result<RgbaImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image: {}", path.display()))?;
    let image = decode_image(&bytes, None)
        .with_context(|| format!("failed to load image: {}", path.display()))?;
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::encode_png;
    use image::Rgba;

    #[test]
    fn decodes_png_to_rgba() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let bytes = encode_png(&source).expect("encode");
        let decoded = decode_image(&bytes, None).expect("decode");
        assert_eq!(decoded, source);
    }

    #[test]
    fn rejects_non_images() {
        let pdf = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n";
        let err = decode_image(pdf, None).expect_err("pdf");
        assert!(matches!(err, EditError::InvalidInput(_)));

        let err = decode_image(b"plain words", Some("text/plain")).expect_err("text");
        assert!(matches!(err, EditError::InvalidInput(_)));
        assert!(decode_image(b"plain words", None).is_err());
    }

    #[test]
    fn rejects_oversized_input() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = decode_image(&bytes, Some("image/png")).expect_err("too large");
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn load_image_file_reports_missing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_image_file(&dir.path().join("nope.png")).expect_err("missing");
        assert!(err.to_string().contains("failed to read image"));
    }
}
