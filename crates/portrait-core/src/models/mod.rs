//! Data models for the application
//!
//! Organized by domain: users and their profile, the patch schema applied to
//! a profile, reference data and the image endpoints' payloads.

mod image;
mod profile;
mod reference;
mod user;

pub use image::*;
pub use profile::*;
pub use reference::*;
pub use user::*;
