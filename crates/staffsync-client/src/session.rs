//! Session lifecycle: logging in, storing the credential and logging out.
//!
//! Logging in is the only place a credential is written. The gateway reads
//! it on every call and clears it when the backend or the network fails.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use staffsync_common::{CredentialProvider, GatewayConfig};

use crate::error::ClientError;
use crate::gateway::AuthGateway;
use crate::transport::{OutboundBody, OutboundRequest, Transport};

/// Body returned by the login endpoint.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    token: String,
    #[serde(default, alias = "role")]
    rol: Option<String>,
}

/// Error body returned by the backend on rejected requests.
#[derive(Deserialize)]
struct ErrorBody {
    message: serde_json::Value,
}

fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: serde_json::Value::String(message),
        }) => message,
        Ok(ErrorBody { message }) => message.to_string(),
        Err(_) if body.trim().is_empty() => fallback.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Login, logout and credential inspection over a shared credential store.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    credentials: CredentialProvider,
    config: Arc<GatewayConfig>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("login_url", &self.config.endpoint(&self.config.login_path))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session sharing the gateway's transport and credential store.
    #[must_use]
    pub fn from_gateway(gateway: &AuthGateway) -> Self {
        Self {
            transport: gateway.transport(),
            credentials: gateway.credentials().clone(),
            config: Arc::new(gateway.config().clone()),
        }
    }

    /// Creates a session over an explicit transport.
    pub fn new(
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

    /// Stores a token obtained elsewhere, replacing the current session.
    ///
    /// Without a role, any role from a previous session is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be written.
    pub async fn establish(&self, token: &str, role: Option<&str>) -> Result<(), ClientError> {
        if self.credentials.write(token, role).await {
            info!("Session established");
            Ok(())
        } else {
            Err(ClientError::CredentialStoreError(
                "failed to persist session credential".to_string(),
            ))
        }
    }

    /// Exchanges email and password for a token and stores it with the role.
    ///
    /// Returns the role reported by the backend, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The backend cannot be reached
    /// - The backend rejects the credentials (401 or 403)
    /// - The backend answers with any other failing status
    /// - The response carries no token
    /// - The credential store cannot be written
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<String>, ClientError> {
        let url = self.config.endpoint(&self.config.login_path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });

        debug!("POST {url}");
        let response = self
            .transport
            .execute(OutboundRequest {
                method: Method::POST,
                url,
                headers,
                body: OutboundBody::Json(serde_json::to_string(&body)?),
            })
            .await?;

        match response.status {
            200..=299 => {}
            401 | 403 => {
                warn!("Login rejected for {email}");
                return Err(ClientError::AuthenticationError(error_message(
                    &response.body,
                    "invalid email or password",
                )));
            }
            status => {
                return Err(ClientError::RequestError {
                    status,
                    message: error_message(&response.body, "login failed"),
                });
            }
        }

        let login: LoginResponse = serde_json::from_str(&response.body)?;
        self.establish(&login.token, login.rol.as_deref()).await?;
        Ok(login.rol)
    }

    /// Removes the token and the role.
    pub async fn logout(&self) {
        self.credentials.clear_all().await;
        info!("Token removed from credential store");
    }

    /// Returns `true` while a token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.has_token().await
    }

    /// Role of the signed-in user.
    pub async fn role(&self) -> Option<String> {
        self.credentials.role().await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;
    use staffsync_common::FileCredentialStore;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(mock_server: &MockServer) -> Session {
        let gateway =
            AuthGateway::new(GatewayConfig::new(mock_server.uri()), CredentialProvider::in_memory())
                .unwrap();
        Session::from_gateway(&gateway)
    }

    fn password() -> SecretString {
        SecretString::new("hunter2".into())
    }

    #[tokio::test]
    async fn test_login_stores_token_and_role() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"email": "ana@example.com", "password": "hunter2"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"token": "jwt-1", "rol": "admin"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        let role = session.login("ana@example.com", &password()).await.unwrap();

        assert_eq!(role.as_deref(), Some("admin"));
        assert!(session.is_authenticated().await);
        assert_eq!(session.role().await.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_login_accepts_access_token_alias() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "jwt-2", "role": "employee"})),
            )
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        session.login("luis@example.com", &password()).await.unwrap();

        assert_eq!(
            session.credentials.read().await.unwrap().expose_secret(),
            "jwt-2"
        );
        assert_eq!(session.role().await.as_deref(), Some("employee"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"statusCode": 401, "message": "Credenciales inválidas"})),
            )
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        let err = session.login("ana@example.com", &password()).await.unwrap_err();

        assert!(err.is_authentication_error());
        assert!(err.to_string().contains("Credenciales inválidas"));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_other_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        let err = session.login("ana@example.com", &password()).await.unwrap_err();

        assert!(matches!(err, ClientError::RequestError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rol": "admin"})))
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        let err = session.login("ana@example.com", &password()).await.unwrap_err();

        assert!(matches!(err, ClientError::SerializationError(_)));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_establish_and_logout() {
        let mock_server = MockServer::start().await;
        let session = session(&mock_server);

        session.establish("jwt-3", Some("admin")).await.unwrap();
        assert!(session.is_authenticated().await);

        session.logout().await;
        assert!(!session.is_authenticated().await);
        assert!(session.role().await.is_none());
    }

    #[tokio::test]
    async fn test_login_without_role_drops_previous_role() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-new"})))
            .mount(&mock_server)
            .await;

        let session = session(&mock_server);
        session.establish("old", Some("admin")).await.unwrap();

        let role = session.login("luis@example.com", &password()).await.unwrap();

        assert_eq!(role, None);
        assert_eq!(
            session.credentials.read().await.unwrap().expose_secret(),
            "jwt-new"
        );
        assert!(session.role().await.is_none());
    }

    #[tokio::test]
    async fn test_establish_without_role_replaces_session() {
        let mock_server = MockServer::start().await;
        let session = session(&mock_server);

        session.establish("jwt-a", Some("admin")).await.unwrap();
        session.establish("jwt-b", None).await.unwrap();

        assert!(session.is_authenticated().await);
        assert!(session.role().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_and_login_recover_from_corrupt_credential_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-4", "rol": "admin"})),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("credentials.json");
        std::fs::write(&file, r#"{"token": "abc""#).unwrap();

        let credentials = CredentialProvider::new(Arc::new(FileCredentialStore::new(&file)));
        let gateway = AuthGateway::new(GatewayConfig::new(mock_server.uri()), credentials).unwrap();
        let session = Session::from_gateway(&gateway);

        session.logout().await;
        assert_eq!(std::fs::read_to_string(&file).unwrap().trim(), "{}");

        std::fs::write(&file, r#"{"token": "abc""#).unwrap();
        let role = session.login("ana@example.com", &password()).await.unwrap();

        assert_eq!(role.as_deref(), Some("admin"));
        assert!(session.is_authenticated().await);
        assert_eq!(session.role().await.as_deref(), Some("admin"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"nope"}"#, "x"), "nope");
        assert_eq!(error_message(r#"{"message":["a","b"]}"#, "x"), r#"["a","b"]"#);
        assert_eq!(error_message("", "fallback"), "fallback");
        assert_eq!(error_message("plain text", "x"), "plain text");
    }
}
