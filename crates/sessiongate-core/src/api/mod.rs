//! HTTP plumbing for talking to the backend.
//!
//! This module provides the `HttpTransport` seam, its reqwest-backed
//! implementation, and the `ApiError` type shared by the whole crate.
//! Requests carry a JWT bearer token issued by the backend's login endpoint.

pub mod error;
pub mod transport;

pub use error::ApiError;
pub use transport::{HttpTransport, ReqwestTransport};
