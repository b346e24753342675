//! Avatar image processing
//!
//! Uploads are checked by filename and size, decoded, cropped to cover a
//! 250x250 square and re-encoded as PNG. Whatever format came in, what is
//! stored and served is always `image/png`.

use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;

/// Side length of stored avatars in pixels
pub const AVATAR_SIZE: u32 = 250;

/// Default upload cap in bytes
pub const DEFAULT_MAX_BYTES: usize = 1_000_000;

/// Accepted filename extensions, compared case-sensitively
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Error type for avatar processing
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Please upload an image")]
    NotAnImage,

    #[error("File too large")]
    TooLarge,

    #[error("Unable to read image: {0}")]
    Decode(String),

    /// Encoding our own output failed
    #[error("Unable to encode avatar: {0}")]
    Encode(String),
}

impl AvatarError {
    /// True if the upload itself is at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AvatarError::Encode(_))
    }
}

/// Returns true if `filename` ends in an accepted image extension
pub fn has_image_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Validates an upload and produces the stored 250x250 PNG
///
/// CPU bound; call from `spawn_blocking` inside async code.
pub fn process_avatar(
    filename: &str,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<Vec<u8>, AvatarError> {
    if !has_image_extension(filename) {
        return Err(AvatarError::NotAnImage);
    }
    if bytes.len() > max_bytes {
        return Err(AvatarError::TooLarge);
    }

    let image = image::load_from_memory(bytes).map_err(|e| AvatarError::Decode(e.to_string()))?;
    let resized = image.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AvatarError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}
