//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`ProviderSettings`] for the identity provider and [`GateSettings`]
//! for the routes, sessions and cookies.

use cognito_gate_core::ProviderSettings;
use cognito_gate_web::GateSettings;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Identity provider configuration (`COGNITO__*`).
    pub cognito: ProviderSettings,

    /// Gate configuration (`GATE__*`).
    #[serde(default)]
    pub gate: GateSettings,
}

fn default_bind_address() -> String {
    "127.0.0.1:8050".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
