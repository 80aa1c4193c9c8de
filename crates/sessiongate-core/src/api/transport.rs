//! HTTP transport used by the session manager.
//!
//! The manager speaks plain `http` request/response types so the network
//! layer can be swapped out (native reqwest, an embedder's own client, or a
//! fake backend in tests).

use async_trait::async_trait;
use http::{Request, Response};
use reqwest::Client;
use tracing::debug;

use super::ApiError;

/// Generic HTTP client.
///
/// `execute` resolves only once the whole body has been read, so a timeout
/// wrapped around it bounds the download too, not just the response headers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError>;
}

/// Transport backed by a rustls `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with no request timeout; callers that need one
    /// bound the future themselves.
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        let request = reqwest::Request::try_from(request)?;
        debug!(method = %request.method(), url = %request.url(), "Sending request");

        let response = self.client.execute(request).await?;

        let mut builder = Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }

        let body = response.bytes().await?;
        Ok(builder.body(body.to_vec())?)
    }
}
