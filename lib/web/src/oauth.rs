//! Authorization-code client built on the oauth2 crate.

use cognito_gate_core::{ConfigurationError, PendingLogin, ProviderConfig, StoredToken};
use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::fmt;
use url::Url;

/// Where to send the browser, and what to remember until it comes back.
#[derive(Debug)]
pub(crate) struct AuthorizationRequest {
    pub url: Url,
    pub pending: PendingLogin,
}

/// Builds the authorization URL for a fresh login attempt.
pub(crate) fn authorization_request(
    provider: &ProviderConfig,
    redirect_uri: String,
    next: Option<String>,
) -> Result<AuthorizationRequest, ConfigurationError> {
    let redirect_url =
        RedirectUrl::new(redirect_uri.clone()).map_err(|e| ConfigurationError::InvalidUrl {
            field: "redirect_uri".to_string(),
            reason: format!("{redirect_uri}: {e}"),
        })?;

    let client = BasicClient::new(ClientId::new(provider.client_id().to_string()))
        .set_client_secret(ClientSecret::new(provider.client_secret().to_string()))
        .set_auth_uri(AuthUrl::from_url(
            provider.endpoints().authorize_url().clone(),
        ))
        .set_redirect_uri(redirect_url);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (url, csrf_token) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().cloned().map(Scope::new))
        .set_pkce_challenge(pkce_challenge)
        .url();

    Ok(AuthorizationRequest {
        url,
        pending: PendingLogin {
            csrf_state: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
            redirect_uri,
            next,
        },
    })
}

/// Why a code exchange failed.
#[derive(Debug)]
pub(crate) enum ExchangeError {
    /// The provider refused the code (`invalid_grant`).
    InvalidGrant(String),
    /// Anything else: transport, client credentials, malformed response.
    Failed(String),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGrant(msg) => write!(f, "authorization code rejected: {msg}"),
            Self::Failed(msg) => write!(f, "token exchange failed: {msg}"),
        }
    }
}

/// Exchanges an authorization code for tokens at the provider's token endpoint.
pub(crate) async fn exchange_code(
    provider: &ProviderConfig,
    http_client: &reqwest::Client,
    pending: &PendingLogin,
    code: &str,
) -> Result<StoredToken, ExchangeError> {
    let redirect_url = RedirectUrl::new(pending.redirect_uri.clone())
        .map_err(|e| ExchangeError::Failed(format!("invalid redirect URI: {e}")))?;

    let client = BasicClient::new(ClientId::new(provider.client_id().to_string()))
        .set_client_secret(ClientSecret::new(provider.client_secret().to_string()))
        .set_token_uri(TokenUrl::from_url(provider.endpoints().token_url().clone()))
        .set_redirect_uri(redirect_url);

    let token_result = client
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
        .request_async(http_client)
        .await
        .map_err(|e| match e {
            RequestTokenError::ServerResponse(response)
                if *response.error() == BasicErrorResponseType::InvalidGrant =>
            {
                ExchangeError::InvalidGrant(response.to_string())
            }
            other => ExchangeError::Failed(other.to_string()),
        })?;

    Ok(StoredToken::new(
        token_result.access_token().secret().clone(),
        token_result.refresh_token().map(|t| t.secret().clone()),
        token_result.expires_in(),
    ))
}
