//! Input image checks before recognition.

use image::ImageFormat;

use crate::error::OcrError;
use crate::invoice::rules::DATA_URI_PREFIX;

/// Largest image accepted by default (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Check that `bytes` is a JPEG, PNG or GIF image no larger than `max_bytes`.
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<ImageFormat, OcrError> {
    if bytes.len() > max_bytes {
        return Err(OcrError::InvalidImage(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| OcrError::InvalidImage("unrecognized image format".to_string()))?;

    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif => Ok(format),
        other => Err(OcrError::InvalidImage(format!(
            "unsupported image format {:?}, use JPEG, PNG or GIF",
            other
        ))),
    }
}

/// Strip a `data:<mime>;base64,` prefix, returning the bare payload.
pub fn strip_data_uri(s: &str) -> &str {
    match DATA_URI_PREFIX.find(s) {
        Some(prefix) => &s[prefix.end()..],
        None => s,
    }
}
