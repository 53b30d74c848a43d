//! Portrait database layer
//!
//! Postgres repositories for users, profiles and reference data, plus the
//! transaction helper they share.

pub mod db;

pub use db::*;
