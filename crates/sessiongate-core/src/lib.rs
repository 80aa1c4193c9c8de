//! sessiongate core - client-side session handling for bearer-token backends.
//!
//! Stores the access token, validates it against the backend, attaches it to
//! outgoing requests, and decides when the user has to log in again.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Result;

// Request/response types used throughout the public API
pub use http;

pub use api::{ApiError, HttpTransport, ReqwestTransport};
pub use auth::{
    Credential, DenialReason, FetchOutcome, FileStore, KeyringStore, MemoryStore, Navigator,
    SessionCheck, SessionGuard, SessionManager, TokenStore,
};
pub use config::{Config, StoreKind};

/// Open the token store selected in `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.store {
        StoreKind::Keyring => Arc::new(KeyringStore::new()?),
        StoreKind::File => Arc::new(FileStore::new(config.cache_dir()?)),
    };
    Ok(store)
}
