//! Request-scoped handle to the identity provider.
//!
//! The gate builds a [`Cognito`] from the current session and hands it to
//! the handler through the request extensions, so handlers receive it as an
//! ordinary extractor instead of looking it up in global state.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use cognito_gate_core::{GrantError, ProviderError, StoredToken};
use serde_json::{Map, Value};
use std::fmt;

use crate::gate::AuthRejection;
use crate::state::CognitoGate;

/// Longest provider error body kept in logs and errors.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Why a call through the session's token failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// The token is missing, expired or was rejected.
    Grant(GrantError),
    /// The provider failed for another reason.
    Provider(ProviderError),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ProxyError {}

/// HTTP client bound to the OAuth2 token in the current session.
#[derive(Clone)]
pub struct Cognito {
    gate: CognitoGate,
    token: Option<StoredToken>,
}

impl Cognito {
    /// Creates a handle for `token`.
    #[must_use]
    pub fn new(gate: CognitoGate, token: Option<StoredToken>) -> Self {
        Self { gate, token }
    }

    /// Returns true if the session holds a token.
    #[must_use]
    pub fn authorized(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the session's token.
    #[must_use]
    pub fn token(&self) -> Option<&StoredToken> {
        self.token.as_ref()
    }

    /// Sends a bearer-authenticated GET to a provider-relative path.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` or `TokenExpired` without touching the network
    /// when the token is unusable, and a provider error on transport failure.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, ProxyError> {
        let token = self
            .token
            .as_ref()
            .ok_or(ProxyError::Grant(GrantError::MissingToken))?;
        if token.is_expired() {
            return Err(ProxyError::Grant(GrantError::TokenExpired));
        }

        let url = self.gate.provider().endpoints().url_for(path);
        self.gate
            .http()
            .get(&url)
            .bearer_auth(token.access_token())
            .send()
            .await
            .map_err(|e| {
                ProxyError::Provider(ProviderError::Transport {
                    reason: e.to_string(),
                })
            })
    }

    /// Fetches the user's claims from the user info endpoint.
    ///
    /// # Errors
    ///
    /// A 401 answer means the bearer token was rejected and is reported as
    /// `InvalidGrant`; any other non-success status is a provider error.
    pub async fn user_info(&self) -> Result<Map<String, Value>, ProxyError> {
        let response = self
            .get(cognito_gate_core::provider::USER_INFO_PATH)
            .await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body = truncated_body(response).await;
            return Err(ProxyError::Grant(GrantError::InvalidGrant { reason: body }));
        }

        if !status.is_success() {
            let body = truncated_body(response).await;
            return Err(ProxyError::Provider(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            }));
        }

        match response.json::<Value>().await {
            Ok(Value::Object(claims)) => Ok(claims),
            Ok(other) => Err(ProxyError::Provider(ProviderError::InvalidResponse {
                reason: format!("expected a JSON object, got {other}"),
            })),
            Err(e) => Err(ProxyError::Provider(ProviderError::InvalidResponse {
                reason: e.to_string(),
            })),
        }
    }
}

impl fmt::Debug for Cognito {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cognito")
            .field("provider_host", &self.gate.provider().host())
            .field("token", &self.token)
            .finish()
    }
}

impl<S> FromRequestParts<S> for Cognito
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Cognito>()
            .cloned()
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

async fn truncated_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
