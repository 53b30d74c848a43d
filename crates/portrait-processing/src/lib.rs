//! Portrait Processing Library
//!
//! Client-side image handling for the profile picture flow: validating a
//! selected file, choosing a square crop and rendering it to JPEG, and
//! tracking the ephemeral preview/output handles those steps create.
//!
//! The same validator also backs the server's upload checks.

pub mod candidate;
pub mod crop;
pub mod cropper;
pub mod handles;
pub mod validator;

pub use candidate::{CandidateId, ImageCandidate};
pub use crop::CropRegion;
pub use cropper::{CropError, Cropper, CropperState, ProcessedImage};
pub use handles::{HandleArena, HandleId, HandleKind, ObjectHandle};
pub use validator::{
    ImageValidator, SelectionAdvisory, SelectionOutcome, ValidatedImage, ValidationError,
    ValidationReason, ValidationResult,
};
