//! Error types for the cognito-gate core crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConfigurationError`: invalid setup, raised once at construction
//! - `GrantError`: the stored grant is unusable; recovered as "not logged in"
//! - `ProviderError`: the identity provider misbehaved
//! - `SessionStoreError`: the session backend failed

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors raised while building the provider or gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A Cognito domain prefix was given without the region it lives in.
    MissingRegion { domain: String },
    /// The domain was empty.
    EmptyDomain,
    /// A configured URL could not be parsed.
    InvalidUrl { field: String, reason: String },
    /// A session attribute mapping entry was malformed.
    InvalidAttributeMapping { entry: String },
    /// A route path was malformed.
    InvalidPath { path: String, reason: String },
    /// The outbound HTTP client could not be created.
    HttpClient { reason: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRegion { domain } => {
                write!(
                    f,
                    "domain '{domain}' is a Cognito domain prefix and requires a region"
                )
            }
            Self::EmptyDomain => write!(f, "Cognito domain must not be empty"),
            Self::InvalidUrl { field, reason } => {
                write!(f, "invalid URL for {field}: {reason}")
            }
            Self::InvalidAttributeMapping { entry } => {
                write!(f, "invalid session attribute mapping entry '{entry}'")
            }
            Self::InvalidPath { path, reason } => {
                write!(f, "invalid route path '{path}': {reason}")
            }
            Self::HttpClient { reason } => {
                write!(f, "failed to create HTTP client: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// The stored authorization grant can no longer be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// The provider rejected the code or the bearer token.
    InvalidGrant { reason: String },
    /// The access token passed its expiry.
    TokenExpired,
    /// There is no token to present.
    MissingToken,
}

impl fmt::Display for GrantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGrant { reason } => write!(f, "invalid grant: {reason}"),
            Self::TokenExpired => write!(f, "access token has expired"),
            Self::MissingToken => write!(f, "no access token in session"),
        }
    }
}

impl std::error::Error for GrantError {}

/// The identity provider answered in a way the gate cannot use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Non-success HTTP status other than a rejected bearer token.
    UnexpectedStatus { status: u16, body: String },
    /// A claim required by the attribute mapping was absent.
    MissingClaim { claim: String },
    /// The response body was not what the endpoint promises.
    InvalidResponse { reason: String },
    /// The request never produced a response.
    Transport { reason: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedStatus { status, body } => {
                write!(f, "identity provider returned status {status}: {body}")
            }
            Self::MissingClaim { claim } => {
                write!(f, "user info response is missing claim '{claim}'")
            }
            Self::InvalidResponse { reason } => {
                write!(f, "invalid identity provider response: {reason}")
            }
            Self::Transport { reason } => {
                write!(f, "identity provider request failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from a session storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The backend could not be reached or refused the operation.
    Backend { reason: String },
    /// A stored record could not be decoded.
    Corrupt { session_id: String, reason: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { reason } => write!(f, "session store error: {reason}"),
            Self::Corrupt { session_id, reason } => {
                write!(f, "session '{session_id}' is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_region_names_the_domain() {
        let err = ConfigurationError::MissingRegion {
            domain: "my-app".to_string(),
        };
        assert!(err.to_string().contains("my-app"));
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn grant_error_display() {
        assert!(GrantError::TokenExpired.to_string().contains("expired"));
        let err = GrantError::InvalidGrant {
            reason: "code already used".to_string(),
        };
        assert!(err.to_string().contains("code already used"));
    }

    #[test]
    fn provider_error_includes_status() {
        let err = ProviderError::UnexpectedStatus {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn result_alias_carries_report() {
        fn build() -> Result<(), ConfigurationError> {
            Err(ConfigurationError::EmptyDomain.into())
        }
        let report = build().expect_err("empty domain is rejected");
        assert!(report.to_string().contains("must not be empty"));
    }
}
