//! Axum integration for gating an application behind a Cognito login.
//!
//! [`CognitoGate`] holds the provider configuration, the session store and
//! the route layout. It provides:
//! - the login, callback and optional logout routes ([`CognitoGate::routes`])
//! - middleware for the entry point ([`require_login`]) and for other
//!   protected handlers ([`require_auth`])
//! - the [`CurrentUser`] and [`Cognito`] extractors for gated handlers
//!
//! # Example
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use cognito_gate_core::ProviderConfig;
//! use cognito_gate_web::{CognitoGate, CurrentUser, GateSettings};
//!
//! async fn index(CurrentUser(user): CurrentUser) -> String {
//!     format!("Welcome, {}", user.email().unwrap_or("stranger"))
//! }
//!
//! # fn build() -> Result<Router, Box<dyn std::error::Error>> {
//! let provider = ProviderConfig::builder("client-id", "client-secret", "my-app")
//!     .region("eu-west-1")
//!     .build()
//!     .map_err(|e| e.to_string())?;
//! let gate = CognitoGate::with_memory_store(provider, GateSettings::default())
//!     .map_err(|e| e.to_string())?;
//!
//! let app = gate
//!     .protect_index(Router::new().route("/", get(index)))
//!     .merge(gate.routes());
//! # Ok(app)
//! # }
//! ```

pub mod blueprint;
pub mod config;
pub mod gate;
mod oauth;
pub mod paths;
pub mod proxy;
pub mod state;

pub use blueprint::{AuthorizedQuery, CallbackError, LoginQuery};
pub use config::{GateSettings, ProviderErrorPolicy, SessionConfig};
pub use gate::{AuthRejection, CurrentUser, require_auth, require_login};
pub use paths::MountPaths;
pub use proxy::{Cognito, ProxyError};
pub use state::CognitoGate;
