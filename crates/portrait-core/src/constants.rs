//! Limits and fixed values shared by the client and server halves of the pipeline.

/// Largest accepted source or upload, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Smallest accepted edge, in pixels.
pub const MIN_IMAGE_DIMENSION: u32 = 200;

/// Largest accepted edge, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 10_000;

/// Largest raster edge a render surface can allocate.
pub const CANVAS_CEILING: u32 = 16_384;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.1;

/// JPEG quality of the committed crop (0-100).
pub const OUTPUT_JPEG_QUALITY: u8 = 95;

pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Deadline for a whole save sequence.
pub const SAVE_TIMEOUT_SECS: u64 = 30;

/// MIME types accepted for profile images. `image/jpg` is a non-standard alias
/// some browsers still report.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Key prefix under which all profile images are stored.
pub const PROFILE_IMAGE_PREFIX: &str = "profile-images";

pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Placeholder a form puts in `image` while a freshly cropped picture is still
/// local. It must be replaced by an uploaded URL before the profile is saved.
pub const CROPPED_IMAGE_SENTINEL: &str = "cropped";

/// Multipart framing allowance on top of the image size limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Maximum length of the free-text bio.
pub const MAX_BIO_LENGTH: u64 = 500;

/// Whether `content_type` (parameters and case ignored) is in the allow-list.
pub fn is_allowed_image_type(content_type: &str) -> bool {
    let normalized = normalize_content_type(content_type);
    ALLOWED_IMAGE_TYPES.contains(&normalized.as_str())
}

/// Lowercases a MIME type and strips parameters such as `; charset=...`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_image_types() {
        assert!(is_allowed_image_type("image/jpeg"));
        assert!(is_allowed_image_type("image/jpg"));
        assert!(is_allowed_image_type("IMAGE/PNG"));
        assert!(is_allowed_image_type("image/webp; q=0.9"));
        assert!(!is_allowed_image_type("image/gif"));
        assert!(!is_allowed_image_type("application/octet-stream"));
        assert!(!is_allowed_image_type(""));
    }

    #[test]
    fn test_limits() {
        assert_eq!(MAX_IMAGE_BYTES, 5_242_880);
        assert!(MAX_IMAGE_DIMENSION < CANVAS_CEILING);
    }
}
