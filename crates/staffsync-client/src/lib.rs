//! # staffsync-client
//!
//! Client library for the staffsync HR backend.
//!
//! All calls go through [`AuthGateway`], which attaches the stored bearer
//! token, classifies the response and invalidates the credential when the
//! backend or the network says the session is no longer usable. On top of
//! it sit:
//! - [`Session`] for logging in and out
//! - [`HrApi`] for typed employee, course and project calls
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use secrecy::SecretString;
//! use staffsync_client::{AuthGateway, HrApi, Session};
//! use staffsync_common::{CredentialProvider, FileCredentialStore, GatewayConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GatewayConfig::load_or_default()?;
//! let credentials = CredentialProvider::new(Arc::new(FileCredentialStore::open_default()?));
//!
//! let gateway = AuthGateway::new(config, credentials)?;
//! let session = Session::from_gateway(&gateway);
//! session
//!     .login("ana@example.com", &SecretString::new("hunter2".into()))
//!     .await?;
//!
//! let api = HrApi::new(gateway);
//! match api.employees().await.into_legacy() {
//!     Some(list) => println!("{} employees", list.employees.len()),
//!     None => println!("not authenticated or request failed"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod request;
pub mod resources;
pub mod session;
pub mod transport;

pub use error::{ClientError, FailureKind};
pub use gateway::{AuthGateway, GatewayOutcome, StatusClass, classify_status, fallback_payload};
pub use request::{RequestBody, RequestDescriptor};
pub use resources::HrApi;
pub use session::Session;
pub use transport::{OutboundBody, OutboundRequest, ReqwestTransport, Transport, TransportResponse};
