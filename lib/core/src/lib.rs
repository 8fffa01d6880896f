//! Core types for gating a web application behind a Cognito login.
//!
//! This crate provides:
//! - Provider configuration and endpoint derivation (`ProviderConfig`)
//! - Session records holding the OAuth2 token and cached identity (`Session`)
//! - The session storage seam (`SessionStore`, `MemorySessionStore`)
//! - The typed outcome of an authorization check (`AuthOutcome`)
//!
//! Nothing here depends on a web framework; the axum integration lives in
//! `cognito-gate-web`.
//!
//! # Example
//!
//! ```
//! use cognito_gate_core::ProviderConfig;
//!
//! let config = ProviderConfig::builder("client-id", "client-secret", "my-app")
//!     .region("eu-west-1")
//!     .add_scope("phone")
//!     .build()
//!     .expect("valid configuration");
//!
//! assert_eq!(config.host(), "my-app.auth.eu-west-1.amazoncognito.com");
//! assert_eq!(config.scopes(), ["openid", "email", "profile", "phone"]);
//! ```

pub mod error;
pub mod identity;
pub mod provider;
pub mod session;
pub mod store;

pub use error::{ConfigurationError, GrantError, ProviderError, Result, SessionStoreError};
pub use identity::{AttributeMapping, AuthOutcome, AuthState, Identity, UnauthenticatedReason};
pub use provider::{ProviderConfig, ProviderConfigBuilder, ProviderEndpoints, ProviderSettings};
pub use session::{PendingLogin, Session, SessionId, StoredToken};
pub use store::{MemorySessionStore, SessionStore};
