use std::sync::Arc;

use http::{header, Request, Response, StatusCode};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, HttpTransport};
use crate::config::Config;
use crate::models::{TokenResponse, UserProfile};

use super::credentials::{Credential, TokenStore};

/// Endpoint that echoes the account behind a token
const ME_ENDPOINT: &str = "auth/me";

/// Form-login endpoint issuing bearer tokens
const LOGIN_ENDPOINT: &str = "auth/login";

/// Why a session check failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    MissingCredential,
    /// Stored token cannot be sent as a header value
    MalformedCredential,
    Timeout,
    Transport(String),
    Rejected(StatusCode),
}

impl DenialReason {
    /// Whether the failure deserves an error log. Timeouts stay quiet; a
    /// missing token or a backend rejection is an ordinary logged-out state.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            DenialReason::Transport(_) | DenialReason::MalformedCredential
        )
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::MissingCredential => write!(f, "not logged in"),
            DenialReason::MalformedCredential => write!(f, "stored token is malformed"),
            DenialReason::Timeout => write!(f, "session check timed out"),
            DenialReason::Transport(msg) => write!(f, "network error: {}", msg),
            DenialReason::Rejected(status) => write!(f, "token rejected ({})", status),
        }
    }
}

/// Result of a session check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// Path is reachable without a session
    Exempt,
    Valid,
    Denied(DenialReason),
}

impl SessionCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, SessionCheck::Exempt | SessionCheck::Valid)
    }
}

/// Response from an authenticated request
#[derive(Debug)]
pub enum FetchOutcome {
    Accepted(Response<Vec<u8>>),
    /// Backend answered 401; the stored token has already been dropped
    Unauthorized(Response<Vec<u8>>),
}

impl FetchOutcome {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchOutcome::Unauthorized(_))
    }

    pub fn response(&self) -> &Response<Vec<u8>> {
        match self {
            FetchOutcome::Accepted(r) | FetchOutcome::Unauthorized(r) => r,
        }
    }

    pub fn into_response(self) -> Response<Vec<u8>> {
        match self {
            FetchOutcome::Accepted(r) | FetchOutcome::Unauthorized(r) => r,
        }
    }
}

/// Owns the persisted token and everything that reads or drops it.
/// Clone is cheap - store and transport are shared.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn HttpTransport>,
}

impl SessionManager {
    pub fn new(
        config: Config,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Paths that must stay reachable without a session (landing, login)
    pub fn is_exempt(&self, path: &str) -> bool {
        self.config.exempt_paths.iter().any(|p| p == path)
    }

    /// The resident token. A store that cannot be read counts as empty.
    pub fn credential(&self) -> Option<Credential> {
        match self.store.get() {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Failed to read stored token");
                None
            }
        }
    }

    /// Persist a token obtained elsewhere, replacing the current one
    pub fn store_credential(&self, credential: &Credential) -> Result<(), ApiError> {
        self.store
            .save(credential)
            .map_err(|e| ApiError::Store(format!("{:#}", e)))
    }

    /// Drop the resident token. Safe to call when none is stored.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove() {
            warn!(error = %format!("{:#}", e), "Failed to remove stored token");
        }
    }

    /// Decide whether `path` may be shown, asking the backend if needed.
    /// Any failure drops the stored token.
    pub async fn validate(&self, path: &str) -> SessionCheck {
        if self.is_exempt(path) {
            debug!(path, "Path exempt from session check");
            return SessionCheck::Exempt;
        }

        let Some(credential) = self.credential() else {
            debug!(path, "No stored token");
            return SessionCheck::Denied(DenialReason::MissingCredential);
        };

        let reason = match self.verify(&credential).await {
            Ok(()) => {
                debug!(path, "Session valid");
                return SessionCheck::Valid;
            }
            Err(reason) => reason,
        };

        self.clear();
        if reason.is_reportable() {
            error!(path, reason = %reason, "Session check failed");
        } else {
            debug!(path, reason = %reason, "Session check failed");
        }
        SessionCheck::Denied(reason)
    }

    async fn verify(&self, credential: &Credential) -> Result<(), DenialReason> {
        let auth = credential
            .bearer_header()
            .map_err(|_| DenialReason::MalformedCredential)?;
        let request = Request::get(self.config.endpoint(ME_ENDPOINT))
            .header(header::AUTHORIZATION, auth)
            .body(Vec::new())
            .map_err(|e| DenialReason::Transport(e.to_string()))?;

        // The limit covers the body as well, since transports hand back a
        // fully read response. `/auth/me` bodies are small.
        let timeout = self.config.validation_timeout();
        match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Err(_) => Err(DenialReason::Timeout),
            Ok(Err(e)) => Err(DenialReason::Transport(e.to_string())),
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(DenialReason::Rejected(response.status())),
        }
    }

    /// Send `request` with the stored token attached, if there is one.
    /// A 401 drops the token but is still handed back to the caller.
    pub async fn send(&self, mut request: Request<Vec<u8>>) -> Result<FetchOutcome, ApiError> {
        if let Some(credential) = self.credential() {
            request
                .headers_mut()
                .insert(header::AUTHORIZATION, credential.bearer_header()?);
        }

        let uri = request.uri().clone();
        let response = self.transport.execute(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%uri, "Request unauthorized, dropping stored token");
            self.clear();
            return Ok(FetchOutcome::Unauthorized(response));
        }

        debug!(%uri, status = %response.status(), "Request complete");
        Ok(FetchOutcome::Accepted(response))
    }

    /// Exchange username and password for a token and store it
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let form = serde_urlencoded::to_string([("username", username), ("password", password)])
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let request = Request::post(self.config.endpoint(LOGIN_ENDPOINT))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .body(form.into_bytes())?;

        let response = Self::check_response(self.transport.execute(request).await?)?;
        let token: TokenResponse = serde_json::from_slice(response.body())
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            warn!(token_type = %token.token_type, "Unexpected token type");
        }

        let credential = Credential::new(token.access_token);
        self.store_credential(&credential)?;
        info!(username, "Logged in");
        Ok(credential)
    }

    /// Fetch the account behind the stored token
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        if self.credential().is_none() {
            return Err(ApiError::Unauthorized);
        }

        let request = Request::get(self.config.endpoint(ME_ENDPOINT))
            .header(header::ACCEPT, "application/json")
            .body(Vec::new())?;

        let timeout = self.config.validation_timeout();
        let outcome = tokio::time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

        let response = Self::check_response(outcome.into_response())?;
        serde_json::from_slice(response.body())
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse user profile: {}", e)))
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(response: Response<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let body = String::from_utf8_lossy(response.body());
            Err(ApiError::from_status(response.status(), &body))
        }
    }
}
