//! Authentication module for managing the bearer-token session.
//!
//! This module provides:
//! - `TokenStore`: the single persisted credential slot (keychain, file, memory)
//! - `SessionManager`: validation against `/auth/me`, authenticated requests, login
//! - `SessionGuard`: redirects to the login page when the session is unusable
//!
//! Tokens carry no local expiry; only the backend decides whether one is valid.

pub mod credentials;
pub mod guard;
pub mod session;

pub use credentials::{Credential, FileStore, KeyringStore, MemoryStore, TokenStore, TOKEN_KEY};
pub use guard::{Navigator, SessionGuard};
pub use session::{DenialReason, FetchOutcome, SessionCheck, SessionManager};
