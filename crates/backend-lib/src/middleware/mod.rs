// crates/backend-lib/src/middleware/mod.rs

//! Request guards for the HTTP surface.

pub mod auth;

pub use auth::CurrentPrincipal;
