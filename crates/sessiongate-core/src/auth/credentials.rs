use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use http::HeaderValue;
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

const SERVICE_NAME: &str = "sessiongate";

/// Fixed key the bearer token is persisted under
pub const TOKEN_KEY: &str = "access_token";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Opaque bearer token. Any string is accepted; the backend decides validity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token
    pub fn bearer_header(&self) -> Result<HeaderValue, ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|e| ApiError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Single persisted credential slot.
pub trait TokenStore: Send + Sync {
    /// Read the resident credential, if any
    fn get(&self) -> Result<Option<Credential>>;

    /// Store a credential, replacing any existing one
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Delete the credential. Removing an absent credential is not an error.
    fn remove(&self) -> Result<()>;
}

/// Credential slot in the OS keychain
pub struct KeyringStore {
    entry: Entry,
}

impl KeyringStore {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)
            .context("Failed to create keyring entry")?;
        Ok(Self { entry })
    }
}

impl TokenStore for KeyringStore {
    fn get(&self) -> Result<Option<Credential>> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(Credential::new(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.entry
            .set_password(credential.as_str())
            .context("Failed to store token in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// Credential slot as a JSON file in the cache directory
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// When the resident token was written, if there is one
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load()?.map(|s| s.saved_at))
    }

    fn load(&self) -> Result<Option<StoredSession>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let stored = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;
        Ok(Some(stored))
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl TokenStore for FileStore {
    fn get(&self) -> Result<Option<Credential>> {
        Ok(self.load()?.map(|s| Credential::new(s.access_token)))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
            .context("Failed to create cache directory")?;
        let stored = StoredSession {
            access_token: credential.as_str().to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        write_private(&self.session_path(), contents.as_bytes())
            .context("Failed to write session file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match std::fs::remove_file(self.session_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete session file"),
        }
    }
}

/// Write a file readable only by the owner
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on create; tighten files left by older versions
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// In-process credential slot
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl TokenStore for MemoryStore {
    fn get(&self) -> Result<Option<Credential>> {
        let slot = self.slot.lock().map_err(|_| anyhow!("Token slot lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("Token slot lock poisoned"))?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("Token slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}
