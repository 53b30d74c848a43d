//! Portrait API
//!
//! HTTP service for profile images: authenticated upload and deletion against
//! object storage, and the transactional profile update that records the
//! chosen image.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
