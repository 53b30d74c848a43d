//! Bearer token authentication.
//!
//! Identity is issued elsewhere; this service only verifies HS256 tokens
//! whose `sub` is the user id.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::{JwtClaims, JwtVerifier};
pub use models::AuthUser;
