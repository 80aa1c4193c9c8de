//! Data models for backend auth payloads.
//!
//! - `UserProfile`, `UserRole`: the account behind the current token
//! - `TokenResponse`: body returned by the login endpoint

pub mod user;

pub use user::{TokenResponse, UserProfile, UserRole};
