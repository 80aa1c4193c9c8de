use std::sync::Arc;

use http::{Request, Response};
use tracing::info;

use crate::api::ApiError;

use super::session::SessionManager;

/// Performs the "go to the login page" side effect.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Caller-side adapter over `SessionManager` that sends the user to the
/// login page whenever the session turns out to be unusable.
#[derive(Clone)]
pub struct SessionGuard {
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
}

impl SessionGuard {
    pub fn new(session: SessionManager, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// True if `path` may be shown. Redirects to login otherwise.
    pub async fn check_auth(&self, path: &str) -> bool {
        let check = self.session.validate(path).await;
        if !check.is_ok() {
            self.redirect_to_login();
        }
        check.is_ok()
    }

    /// Send `request` with the stored token. A 401 redirects to login and
    /// is still returned.
    pub async fn auth_fetch(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        let outcome = self.session.send(request).await?;
        if outcome.is_unauthorized() {
            self.redirect_to_login();
        }
        Ok(outcome.into_response())
    }

    /// Local-only logout
    pub fn logout(&self) {
        self.session.clear();
        info!("Logged out");
        self.redirect_to_login();
    }

    fn redirect_to_login(&self) {
        self.navigator.redirect(&self.session.config().login_path);
    }
}
