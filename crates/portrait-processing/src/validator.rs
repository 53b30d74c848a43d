//! Profile image validation
//!
//! [`ImageValidator::validate`] runs the ordered client rules on a selected
//! file. The first failing rule decides the outcome:
//!
//! 1. size over the limit: `tooLarge`
//! 2. MIME type outside the allow-list: `invalidType`
//! 3. bytes that do not decode: `corrupted` (a decodable format outside the
//!    allow-list is `invalidType`)
//! 4. an edge under the minimum: `tooSmall`
//! 5. an edge over the maximum: `dimensionsTooLarge`
//!
//! Server-side uploads use [`ImageValidator::check_upload`], which never decodes.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader, Limits};
use portrait_core::constants::{
    is_allowed_image_type, MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION, MIN_IMAGE_DIMENSION,
};
use serde::Serialize;

use crate::candidate::{CandidateId, ImageCandidate};

const ALLOWED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];
// Widest pixel the allowed formats decode to (16-bit RGBA PNG).
const MAX_BYTES_PER_PIXEL: u64 = 8;
// Decoder working buffers on top of the output raster.
const DECODER_HEADROOM_BYTES: u64 = 64 * 1024 * 1024;

/// Why a selected file was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationReason {
    TooLarge,
    InvalidType,
    Corrupted,
    TooSmall,
    DimensionsTooLarge,
}

impl ValidationReason {
    /// Message shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationReason::TooLarge => {
                "Image is too large. Please use an image smaller than 5MB."
            }
            ValidationReason::InvalidType => {
                "Please select a valid image file (JPG, PNG, or WebP)."
            }
            ValidationReason::Corrupted => {
                "This image file appears to be corrupted. Please try a different image."
            }
            ValidationReason::TooSmall => {
                "Image is too small. Please use an image at least 200x200 pixels."
            }
            ValidationReason::DimensionsTooLarge => {
                "Image dimensions are too large. Please use an image smaller than 10000x10000 pixels."
            }
        }
    }
}

/// A candidate that passed every rule, with its decoded raster.
#[derive(Clone)]
pub struct ValidatedImage {
    pub candidate_id: CandidateId,
    pub file_name: String,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Encoded source, kept for the preview handle
    pub source: Bytes,
    pub image: DynamicImage,
}

impl std::fmt::Debug for ValidatedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedImage")
            .field("candidate_id", &self.candidate_id)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ValidationResult {
    Valid(ValidatedImage),
    Invalid {
        candidate_id: CandidateId,
        reason: ValidationReason,
        message: &'static str,
    },
}

impl ValidationResult {
    fn invalid(candidate_id: CandidateId, reason: ValidationReason) -> Self {
        tracing::debug!(candidate = %candidate_id, ?reason, "Image candidate rejected");
        ValidationResult::Invalid {
            candidate_id,
            reason,
            message: reason.message(),
        }
    }

    pub fn reason(&self) -> Option<ValidationReason> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid { reason, .. } => Some(*reason),
        }
    }

    pub fn into_valid(self) -> Option<ValidatedImage> {
        match self {
            ValidationResult::Valid(image) => Some(image),
            ValidationResult::Invalid { .. } => None,
        }
    }
}

/// Non-blocking remark about a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAdvisory {
    /// Several files were picked; only the first was considered.
    MultipleFiles { ignored: usize },
}

#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub result: ValidationResult,
    pub advisory: Option<SelectionAdvisory>,
}

/// Server-side upload check errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("File content is not an allowed image format")]
    ContentMismatch,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageValidator {
    max_bytes: u64,
    min_dimension: u32,
    max_dimension: u32,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::new(MAX_IMAGE_BYTES, MIN_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION)
    }
}

impl ImageValidator {
    pub fn new(max_bytes: u64, min_dimension: u32, max_dimension: u32) -> Self {
        Self {
            max_bytes,
            min_dimension,
            max_dimension,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Run the ordered rules on `candidate`, consuming it.
    pub fn validate(&self, candidate: ImageCandidate) -> ValidationResult {
        let id = candidate.id;
        let size = candidate.declared_size.max(candidate.bytes.len() as u64);

        if size > self.max_bytes {
            return ValidationResult::invalid(id, ValidationReason::TooLarge);
        }
        if !is_allowed_image_type(&candidate.content_type) {
            return ValidationResult::invalid(id, ValidationReason::InvalidType);
        }

        let (format, image) = match self.decode(&candidate.bytes) {
            Ok(decoded) => decoded,
            Err(reason) => return ValidationResult::invalid(id, reason),
        };

        let (width, height) = image.dimensions();
        if width < self.min_dimension || height < self.min_dimension {
            return ValidationResult::invalid(id, ValidationReason::TooSmall);
        }
        if width > self.max_dimension || height > self.max_dimension {
            return ValidationResult::invalid(id, ValidationReason::DimensionsTooLarge);
        }

        ValidationResult::Valid(ValidatedImage {
            candidate_id: id,
            file_name: candidate.file_name,
            format,
            width,
            height,
            source: candidate.bytes,
            image,
        })
    }

    /// [`validate`](Self::validate) on the blocking pool, so decoding never
    /// stalls the caller's runtime.
    pub async fn validate_async(&self, candidate: ImageCandidate) -> ValidationResult {
        let validator = *self;
        let id = candidate.id;
        match tokio::task::spawn_blocking(move || validator.validate(candidate)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, candidate = %id, "Image decode task failed");
                ValidationResult::invalid(id, ValidationReason::Corrupted)
            }
        }
    }

    /// Validate a picker selection. Only the first file is considered.
    pub fn validate_selection(&self, files: Vec<ImageCandidate>) -> Option<SelectionOutcome> {
        let ignored = files.len().saturating_sub(1);
        let first = files.into_iter().next()?;

        Some(SelectionOutcome {
            result: self.validate(first),
            advisory: (ignored > 0).then_some(SelectionAdvisory::MultipleFiles { ignored }),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<(ImageFormat, DynamicImage), ValidationReason> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| ValidationReason::Corrupted)?;

        let format = reader.format().ok_or(ValidationReason::Corrupted)?;
        if !ALLOWED_FORMATS.contains(&format) {
            return Err(ValidationReason::InvalidType);
        }

        let mut reader = reader;
        reader.limits(self.decode_limits());

        match reader.decode() {
            Ok(image) => Ok((format, image)),
            Err(ImageError::Limits(_)) => Err(ValidationReason::DimensionsTooLarge),
            Err(_) => Err(ValidationReason::Corrupted),
        }
    }

    /// Decoder limits: refuse oversized rasters before allocating them, while
    /// leaving room for a 16-bit RGBA image at the largest allowed size.
    fn decode_limits(&self) -> Limits {
        let max_side = u64::from(self.max_dimension);
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(max_side * max_side * MAX_BYTES_PER_PIXEL + DECODER_HEADROOM_BYTES);
        limits
    }

    /// Declared size and MIME type of an upload.
    pub fn check_declared(&self, content_type: &str, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if !is_allowed_image_type(content_type) {
            return Err(ValidationError::InvalidContentType(content_type.to_string()));
        }
        Ok(())
    }

    /// Format named by the magic bytes, if it is an allowed one.
    pub fn sniff_format(&self, bytes: &[u8]) -> Result<ImageFormat, ValidationError> {
        match image::guess_format(bytes) {
            Ok(format) if ALLOWED_FORMATS.contains(&format) => Ok(format),
            _ => Err(ValidationError::ContentMismatch),
        }
    }

    /// Full server-side check of an uploaded file.
    pub fn check_upload(
        &self,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ImageFormat, ValidationError> {
        self.check_declared(content_type, bytes.len() as u64)?;
        self.sniff_format(bytes)
    }
}
