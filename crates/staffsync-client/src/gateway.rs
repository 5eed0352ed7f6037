//! Authenticated request gateway.
//!
//! Every feature module calls the backend through [`AuthGateway`] instead of
//! the transport. One call does the following:
//!
//! 1. Read the bearer token from the [`CredentialProvider`]. A missing token
//!    does not short-circuit; the server gets to reject the request.
//! 2. Merge caller headers with `Authorization: Bearer <token>` and, unless
//!    the body is a multipart form, `Content-Type: application/json`.
//! 3. Hand the request to the [`Transport`] and wait for it.
//! 4. Classify the result:
//!
//! | Result                     | Outcome                              | Clears         |
//! |----------------------------|--------------------------------------|----------------|
//! | transport error            | [`GatewayOutcome::TransportFailure`] | token and role |
//! | status 500                 | [`GatewayOutcome::ServerFailure`]    | nothing        |
//! | any other failing status   | [`GatewayOutcome::AuthFailure`]      | token only     |
//! | success, JSON body         | [`GatewayOutcome::Success`]          | nothing        |
//! | success, empty/`null` body | `Success({ <collection>: [] })`      | nothing        |
//! | success, malformed body    | `Success({ <collection>: [] })`      | nothing        |
//!
//! With `strict_decoding` enabled a malformed success body yields
//! [`GatewayOutcome::MalformedResponse`] instead of the fallback payload.
//!
//! The gateway never retries and never returns an error value: callers
//! either get a payload or one of the failure outcomes. [`AuthGateway::fetch`]
//! collapses the failures into `None` for callers that only care whether the
//! call worked.
//!
//! # Examples
//!
//! ```no_run
//! use staffsync_client::{AuthGateway, GatewayOutcome, RequestDescriptor};
//! use staffsync_common::{CredentialProvider, EmployeeList, GatewayConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GatewayConfig::new("http://localhost:3001");
//! let credentials = CredentialProvider::in_memory();
//! credentials.write("eyJhbGciOi...", Some("admin")).await;
//!
//! let gateway = AuthGateway::new(config, credentials)?;
//! let request = RequestDescriptor::get(gateway.endpoint("employees"));
//!
//! match gateway.send::<EmployeeList>(request).await {
//!     GatewayOutcome::Success(list) => println!("{} employees", list.employees.len()),
//!     GatewayOutcome::AuthFailure { .. } => println!("please log in again"),
//!     other => println!("request failed: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, error, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;

use staffsync_common::{CredentialProvider, GatewayConfig};

use crate::error::{ClientError, FailureKind};
use crate::request::{RequestBody, RequestDescriptor};
use crate::transport::{OutboundBody, OutboundRequest, ReqwestTransport, Transport};

/// Token text sent when no credential is stored.
///
/// Matches what the web client sends when its storage has no token.
pub const MISSING_TOKEN: &str = "null";

/// Result of one gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum GatewayOutcome<T> {
    /// Success status with a decoded (or fallback) payload.
    Success(T),
    /// Failing status other than 500. The token has been cleared.
    AuthFailure {
        /// HTTP status code.
        status: u16,
    },
    /// Status 500. The credential is untouched.
    ServerFailure,
    /// No response was obtained. Token and role have been cleared.
    TransportFailure,
    /// Success status whose body could not be used. The credential is untouched.
    MalformedResponse {
        /// Why decoding failed.
        reason: String,
    },
}

impl<T> GatewayOutcome<T> {
    /// Returns `true` for [`GatewayOutcome::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure category, or `None` on success.
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::AuthFailure { status } => Some(FailureKind::AuthOrClient { status: *status }),
            Self::ServerFailure => Some(FailureKind::Server),
            Self::TransportFailure => Some(FailureKind::Transport),
            Self::MalformedResponse { .. } => Some(FailureKind::Malformed),
        }
    }

    /// Collapses every failure into `None`.
    ///
    /// This is the unified failure signal: `None` means "not authenticated
    /// or request failed", and the caller must not look for a response.
    pub fn into_legacy(self) -> Option<T> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Borrows the payload, if any.
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Maps the success payload, leaving failures as they are.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> GatewayOutcome<U> {
        match self {
            Self::Success(payload) => GatewayOutcome::Success(f(payload)),
            Self::AuthFailure { status } => GatewayOutcome::AuthFailure { status },
            Self::ServerFailure => GatewayOutcome::ServerFailure,
            Self::TransportFailure => GatewayOutcome::TransportFailure,
            Self::MalformedResponse { reason } => GatewayOutcome::MalformedResponse { reason },
        }
    }
}

/// How a response status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// Exactly 500.
    Server,
    /// Everything else.
    AuthOrClient,
}

/// Classifies a response status code.
#[must_use]
pub const fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        500 => StatusClass::Server,
        _ => StatusClass::AuthOrClient,
    }
}

/// Builds the `{ <collection>: [] }` payload used when a success body is
/// empty, `null` or malformed.
#[must_use]
pub fn fallback_payload(collection: &str) -> Value {
    let mut object = serde_json::Map::new();
    object.insert(collection.to_string(), Value::Array(Vec::new()));
    Value::Object(object)
}

/// Sends requests with the stored bearer token and manages its invalidation.
///
/// Cheap to clone; clones share the transport and credential store.
#[derive(Clone)]
pub struct AuthGateway {
    transport: Arc<dyn Transport>,
    credentials: CredentialProvider,
    config: Arc<GatewayConfig>,
}

impl fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGateway")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    /// Creates a gateway over a [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GatewayConfig, credentials: CredentialProvider) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, credentials, Arc::new(transport)))
    }

    /// Creates a gateway over any transport.
    pub fn with_transport(
        config: GatewayConfig,
        credentials: CredentialProvider,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            credentials,
            config: Arc::new(config),
        }
    }

    /// The gateway's configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The credential provider the gateway reads and clears.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    /// The transport requests are sent through.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Joins `path` onto the configured base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    /// Performs one authenticated request and decodes the response as `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestDescriptor) -> GatewayOutcome<T> {
        let collection = request
            .collection
            .clone()
            .unwrap_or_else(|| self.config.fallback_collection.clone());

        let token = self.credentials.read().await;
        let outbound = match Self::prepare(request, token.as_ref()) {
            Ok(outbound) => outbound,
            Err(e) => return self.transport_failed(&e).await,
        };

        debug!("{} {}", outbound.method, outbound.url);

        let response = match self.transport.execute(outbound).await {
            Ok(response) => response,
            Err(e) => return self.transport_failed(&e).await,
        };

        match classify_status(response.status) {
            StatusClass::Success => self.decode(&response.body, &collection),
            StatusClass::Server => {
                warn!("Server failure (status 500); keeping stored credential");
                GatewayOutcome::ServerFailure
            }
            StatusClass::AuthOrClient => {
                warn!(
                    "Request rejected with status {}; clearing stored token",
                    response.status
                );
                self.credentials.clear_token().await;
                GatewayOutcome::AuthFailure {
                    status: response.status,
                }
            }
        }
    }

    /// Performs one authenticated request, returning `None` on any failure.
    pub async fn fetch<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Option<T> {
        self.send(request).await.into_legacy()
    }

    async fn transport_failed<T>(&self, err: &ClientError) -> GatewayOutcome<T> {
        error!("Fetch error: {err}");
        warn!("Clearing stored token and role after transport failure");
        self.credentials.clear_all().await;
        GatewayOutcome::TransportFailure
    }

    /// Builds the wire request. Header or body problems are reported the
    /// same way a transport would report them.
    fn prepare(
        request: RequestDescriptor,
        token: Option<&SecretString>,
    ) -> Result<OutboundRequest, ClientError> {
        let mut headers = HeaderMap::new();

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        let token_text = token.map_or(MISSING_TOKEN, |secret| secret.expose_secret());
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token_text}"))
            .map_err(|e| ClientError::InvalidHeader(format!("Authorization: {e}")))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        if !request.body.is_form() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let body = match request.body {
            RequestBody::None => OutboundBody::Empty,
            RequestBody::Json(value) => OutboundBody::Json(serde_json::to_string(&value)?),
            RequestBody::Form(form) => OutboundBody::Multipart(form),
        };

        Ok(OutboundRequest {
            method: request.method,
            url: request.url,
            headers,
            body,
        })
    }

    fn decode<T: DeserializeOwned>(&self, text: &str, collection: &str) -> GatewayOutcome<T> {
        let parsed = if text.is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(text)
        };

        let value = match parsed {
            Ok(Value::Null) => return Self::fallback(collection),
            Ok(value) => value,
            Err(e) => {
                error!("Invalid JSON response: {text}");
                error!("Parsing error: {e}");
                return self.recover(collection, e.to_string());
            }
        };

        match serde_json::from_value::<T>(value) {
            Ok(payload) => GatewayOutcome::Success(payload),
            Err(e) => {
                error!("Unexpected response shape: {text}");
                error!("Decoding error: {e}");
                self.recover(collection, e.to_string())
            }
        }
    }

    fn recover<T: DeserializeOwned>(&self, collection: &str, reason: String) -> GatewayOutcome<T> {
        if self.config.strict_decoding {
            GatewayOutcome::MalformedResponse { reason }
        } else {
            Self::fallback(collection)
        }
    }

    fn fallback<T: DeserializeOwned>(collection: &str) -> GatewayOutcome<T> {
        match serde_json::from_value::<T>(fallback_payload(collection)) {
            Ok(payload) => GatewayOutcome::Success(payload),
            Err(e) => {
                error!("Fallback payload for '{collection}' does not fit the expected type: {e}");
                GatewayOutcome::MalformedResponse {
                    reason: format!("fallback payload for '{collection}' rejected: {e}"),
                }
            }
        }
    }
}
