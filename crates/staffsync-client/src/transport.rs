//! HTTP transport seam.
//!
//! The gateway hands a fully prepared [`OutboundRequest`] to a [`Transport`]
//! and gets back a status code and body text. [`ReqwestTransport`] is the
//! production implementation; tests and embedders can supply their own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest_middleware::ClientWithMiddleware;

use staffsync_common::GatewayConfig;

use crate::error::ClientError;

/// Body of an outbound request, already serialized.
pub enum OutboundBody {
    /// No body.
    Empty,
    /// Serialized JSON text.
    Json(String),
    /// Multipart form. The transport chooses the boundary and content type.
    Multipart(Form),
}

impl fmt::Debug for OutboundBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Json(text) => f.debug_tuple("Json").field(&text.len()).finish(),
            Self::Multipart(form) => f.debug_tuple("Multipart").field(&form.boundary()).finish(),
        }
    }
}

/// A request ready to go on the wire.
pub struct OutboundRequest {
    /// HTTP method, exactly as the caller asked.
    pub method: Method,
    /// Target URL, exactly as the caller asked.
    pub url: String,
    /// Final merged headers.
    pub headers: HeaderMap,
    /// Serialized body.
    pub body: OutboundBody,
}

// Custom Debug implementation to avoid exposing the bearer token
impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers = self.headers.clone();
        if headers.contains_key(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, HeaderValue::from_static("[REDACTED]"));
        }
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Status and body text of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text. Empty if the body of a failing response could not be read.
    pub body: String,
}

/// Sends prepared requests.
///
/// Implementations suspend the caller until the exchange completes and
/// report connection-level problems as `Err`, never as a response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one HTTP exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was obtained: invalid URL, DNS or
    /// connection failure, timeout, or an unreadable success body.
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, ClientError>;
}

/// [`Transport`] backed by `reqwest`, wrapped in `reqwest-middleware`.
///
/// No middleware is installed by default. Callers who want retries or
/// tracing can build a [`ClientWithMiddleware`] and pass it to
/// [`ReqwestTransport::from_client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ClientWithMiddleware,
}

impl ReqwestTransport {
    /// Creates a transport using the timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, ClientError> {
        // None means no timeout
        let reqwest_client = match config.timeout_seconds {
            Some(timeout) => reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()?,
            None => reqwest::Client::builder().build()?,
        };

        let client = reqwest_middleware::ClientBuilder::new(reqwest_client).build();
        Ok(Self::from_client(client))
    }

    /// Wraps an existing middleware client.
    #[must_use]
    pub const fn from_client(client: ClientWithMiddleware) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, ClientError> {
        let url = url::Url::parse(&request.url)
            .map_err(|e| ClientError::InvalidUrl(format!("'{}': {e}", request.url)))?;

        let builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);

        let builder = match request.body {
            OutboundBody::Empty => builder,
            OutboundBody::Json(text) => builder.body(text),
            OutboundBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| match e {
            reqwest_middleware::Error::Reqwest(e) => ClientError::NetworkError(e),
            other => ClientError::MiddlewareError(other),
        })?;

        let status = response.status();
        let body = if status.is_success() {
            response.text().await?
        } else {
            // The status alone decides the outcome of a failing response
            response.text().await.unwrap_or_else(|e| {
                debug!("Failed to read body of {status} response: {e}");
                String::new()
            })
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
