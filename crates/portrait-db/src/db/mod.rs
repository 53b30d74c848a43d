//! Database repositories
//!
//! Each repository owns a `PgPool` clone and is exposed to the HTTP layer
//! through a trait so handlers can be tested against in-memory stores.

pub mod profile;
pub mod reference;
pub mod transaction;

pub use profile::{ProfileRepository, ProfileStore};
pub use reference::{ReferenceRepository, ReferenceStore};
pub use transaction::with_transaction;
