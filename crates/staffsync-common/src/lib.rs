//! # staffsync-common
//!
//! Shared building blocks for the staffsync HR client:
//! - Gateway configuration loaded from TOML
//! - Credential storage for the bearer token and role
//! - Serializable payloads for employees, courses and projects
//!
//! ## Example
//!
//! ```
//! use staffsync_common::{CredentialProvider, GatewayConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = GatewayConfig::new("https://hr.example.com/api");
//! let credentials = CredentialProvider::in_memory();
//!
//! credentials.write("eyJhbGciOi...", Some("admin")).await;
//! assert!(credentials.has_token().await);
//! assert_eq!(credentials.role().await.as_deref(), Some("admin"));
//! assert_eq!(config.endpoint("employees"), "https://hr.example.com/api/employees");
//! # }
//! ```

/// Gateway configuration.
///
/// Contains the base URL, timeout and decoding settings, loadable from TOML.
pub mod config;
/// Credential storage.
///
/// Provides the key-value store trait, memory and file implementations, and
/// the provider the gateway reads tokens through.
pub mod credentials;
pub mod models;

pub use config::{ConfigError, GatewayConfig};
pub use credentials::{
    CredentialProvider, CredentialStore, FileCredentialStore, MemoryCredentialStore, ROLE_KEY,
    StoreError, TOKEN_KEY,
};
pub use models::{
    Course, CourseList, Employee, EmployeeCourse, EmployeeCourseList, EmployeeList, EntityId,
    ProjectInfo, ProjectList,
};
