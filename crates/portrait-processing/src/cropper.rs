//! Crop editor state machine.
//!
//! ```text
//! Idle --begin--> Editing --confirm--> Committing --ok--> Done
//!                   ^                       |
//!                   +------- error ---------+
//! any state but Idle --cancel--> Cancelled
//! ```
//!
//! Editing operations (zoom, pan, select) only move the region. Nothing is
//! rendered until `confirm`, and a failed render leaves the editor where it
//! was so the user can adjust and retry.

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};
use portrait_core::constants::{CANVAS_CEILING, OUTPUT_CONTENT_TYPE, OUTPUT_JPEG_QUALITY};

use crate::candidate::CandidateId;
use crate::crop::{CropRegion, Viewport};
use crate::handles::{HandleArena, HandleId, HandleKind};
use crate::validator::ValidatedImage;

/// Renders a cropped raster to JPEG bytes at the given quality.
pub type EncodeFn = fn(&RgbImage, u8) -> Result<Vec<u8>, ImageError>;

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality).encode_image(image)?;
    Ok(buffer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropperState {
    Idle,
    Editing,
    Committing,
    Done,
    Cancelled,
}

impl fmt::Display for CropperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CropperState::Idle => "idle",
            CropperState::Editing => "editing",
            CropperState::Committing => "committing",
            CropperState::Done => "done",
            CropperState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop of {size}px exceeds the {ceiling}px canvas limit")]
    CanvasLimitExceeded { size: u32, ceiling: u32 },

    #[error("Failed to render crop: {0}")]
    ProcessingError(String),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: CropperState,
    },
}

impl CropError {
    /// Stable code, in the same vocabulary as validation reasons.
    pub fn code(&self) -> &'static str {
        match self {
            CropError::CanvasLimitExceeded { .. } => "canvasLimitExceeded",
            CropError::ProcessingError(_) => "processingError",
            CropError::InvalidState { .. } => "invalidState",
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            CropError::CanvasLimitExceeded { .. } => "Image dimensions exceed browser limits",
            CropError::ProcessingError(_) | CropError::InvalidState { .. } => {
                "Failed to process image. Please try again."
            }
        }
    }
}

/// The committed square crop, ready for upload.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub candidate_id: CandidateId,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub file_name: String,
    pub handle: HandleId,
}

struct Session {
    image: ValidatedImage,
    viewport: Viewport,
    preview: HandleId,
}

pub struct Cropper {
    state: CropperState,
    session: Option<Session>,
    output: Option<ProcessedImage>,
    arena: HandleArena,
    canvas_ceiling: u32,
    quality: u8,
    encode: EncodeFn,
}

impl Default for Cropper {
    fn default() -> Self {
        Self::new()
    }
}

impl Cropper {
    pub fn new() -> Self {
        Cropper {
            state: CropperState::Idle,
            session: None,
            output: None,
            arena: HandleArena::new(),
            canvas_ceiling: CANVAS_CEILING,
            quality: OUTPUT_JPEG_QUALITY,
            encode: encode_jpeg,
        }
    }

    pub fn with_canvas_ceiling(mut self, ceiling: u32) -> Self {
        self.canvas_ceiling = ceiling;
        self
    }

    pub fn with_encoder(mut self, encode: EncodeFn) -> Self {
        self.encode = encode;
        self
    }

    pub fn state(&self) -> CropperState {
        self.state
    }

    pub fn arena(&self) -> &HandleArena {
        &self.arena
    }

    /// Display URL of the source being edited.
    pub fn preview_url(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        self.arena.get(session.preview).map(|h| h.url.as_str())
    }

    pub fn output(&self) -> Option<&ProcessedImage> {
        self.output.as_ref()
    }

    fn invalid(&self, operation: &'static str) -> CropError {
        CropError::InvalidState {
            operation,
            state: self.state,
        }
    }

    /// Start editing a validated image with a centred square at zoom 1.
    pub fn begin(&mut self, image: ValidatedImage) -> Result<CropRegion, CropError> {
        if !matches!(self.state, CropperState::Idle | CropperState::Cancelled) {
            return Err(self.invalid("begin"));
        }

        let preview = self.arena.acquire(
            image.candidate_id,
            HandleKind::Preview,
            image.source.clone(),
        );
        let viewport = Viewport::centered(image.width, image.height);
        let region = viewport.region();

        self.session = Some(Session {
            image,
            viewport,
            preview,
        });
        self.state = CropperState::Editing;
        Ok(region)
    }

    fn editing(&mut self, operation: &'static str) -> Result<&mut Session, CropError> {
        if self.state != CropperState::Editing {
            return Err(self.invalid(operation));
        }
        let state = self.state;
        self.session.as_mut().ok_or(CropError::InvalidState { operation, state })
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<CropRegion, CropError> {
        let session = self.editing("zoom")?;
        session.viewport.set_zoom(zoom);
        Ok(session.viewport.region())
    }

    /// Move the crop centre by `(dx, dy)` source pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<CropRegion, CropError> {
        let session = self.editing("pan")?;
        session.viewport.pan(dx, dy);
        Ok(session.viewport.region())
    }

    /// Select an explicit square; it is bounded to the zoom range and the image.
    pub fn select(&mut self, x: u32, y: u32, size: u32) -> Result<CropRegion, CropError> {
        let session = self.editing("select")?;
        session.viewport.select(x, y, size);
        Ok(session.viewport.region())
    }

    pub fn region(&self) -> Option<CropRegion> {
        self.session.as_ref().map(|s| s.viewport.region())
    }

    /// Render the current region to JPEG.
    ///
    /// On success the editor is `Done`, the preview handle is released and
    /// an output handle holds the result. On failure it is back in `Editing`.
    pub fn confirm(&mut self) -> Result<ProcessedImage, CropError> {
        if self.state != CropperState::Editing {
            return Err(self.invalid("confirm"));
        }
        let Some(region) = self.region() else {
            return Err(CropError::CanvasLimitExceeded {
                size: 0,
                ceiling: self.canvas_ceiling,
            });
        };
        if region.size == 0 || region.size > self.canvas_ceiling {
            tracing::debug!(
                size = region.size,
                ceiling = self.canvas_ceiling,
                "Crop exceeds canvas limit"
            );
            return Err(CropError::CanvasLimitExceeded {
                size: region.size,
                ceiling: self.canvas_ceiling,
            });
        }

        self.state = CropperState::Committing;
        let rendered = self.render(region);

        let (candidate_id, preview) = match self.session.as_ref() {
            Some(session) => (session.image.candidate_id, session.preview),
            None => {
                self.state = CropperState::Editing;
                return Err(self.invalid("confirm"));
            }
        };

        let bytes = match rendered {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::warn!(error = %e, candidate = %candidate_id, "Crop rendering failed");
                self.state = CropperState::Editing;
                return Err(CropError::ProcessingError(e.to_string()));
            }
        };

        let handle = self
            .arena
            .acquire(candidate_id, HandleKind::Output, bytes.clone());
        self.arena.release(preview);

        let processed = ProcessedImage {
            candidate_id,
            bytes,
            width: region.size,
            height: region.size,
            content_type: OUTPUT_CONTENT_TYPE,
            file_name: format!("cropped-{}.jpg", chrono::Utc::now().timestamp_millis()),
            handle,
        };

        tracing::debug!(
            candidate = %candidate_id,
            size = region.size,
            size_bytes = processed.bytes.len(),
            "Crop committed"
        );

        self.session = None;
        self.output = Some(processed.clone());
        self.state = CropperState::Done;
        Ok(processed)
    }

    fn render(&self, region: CropRegion) -> Result<Vec<u8>, ImageError> {
        let session = self.session.as_ref().ok_or_else(|| {
            ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::NoMoreData,
            ))
        })?;
        let cropped = session
            .image
            .image
            .crop_imm(region.x, region.y, region.size, region.size)
            .to_rgb8();
        (self.encode)(&cropped, self.quality)
    }

    fn current_candidate(&self) -> Option<CandidateId> {
        self.session
            .as_ref()
            .map(|s| s.image.candidate_id)
            .or_else(|| self.output.as_ref().map(|o| o.candidate_id))
    }

    fn release_current(&mut self) {
        if let Some(candidate) = self.current_candidate() {
            self.arena.release_candidate(candidate);
        }
        self.session = None;
        self.output = None;
    }

    /// Abandon the edit without producing output.
    pub fn cancel(&mut self) {
        if self.state == CropperState::Idle {
            return;
        }
        self.release_current();
        self.state = CropperState::Cancelled;
    }

    /// Drop the current picture so another one can be chosen.
    pub fn change_picture(&mut self) {
        self.release_current();
        self.state = CropperState::Idle;
    }

    /// Release the output handle once the crop has been uploaded.
    pub fn release_committed(&mut self) -> bool {
        match self.output.take() {
            Some(output) => self.arena.release(output.handle),
            None => false,
        }
    }
}
