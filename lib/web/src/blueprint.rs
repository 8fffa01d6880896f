//! Login, callback and logout routes.

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use cognito_gate_core::SessionStoreError;
use rootcause::Report;
use serde::Deserialize;
use std::fmt;

use crate::gate::found;
use crate::oauth::{ExchangeError, authorization_request, exchange_code};
use crate::state::CognitoGate;

/// Query parameters for the login route.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Path to return to after login.
    next: Option<String>,
}

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizedQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CognitoGate {
    /// Returns the login and callback routes, plus the logout route when one
    /// is configured. Merge the result into the host application's router.
    pub fn routes<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = Router::new()
            .route(self.paths().login(), get(login))
            .route(self.paths().authorized(), get(authorized));
        if let Some(logout_path) = self.paths().logout() {
            router = router.route(logout_path, get(logout));
        }
        router.with_state(self.clone())
    }
}

/// Starts a login by redirecting the browser to the provider's authorize
/// endpoint.
pub async fn login(
    State(gate): State<CognitoGate>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let mut session = match gate.load_session(&jar).await {
        Ok(Some(session)) => session,
        Ok(None) => gate.new_pending_session(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let request = match authorization_request(
        gate.provider(),
        gate.redirect_uri(&headers),
        safe_next(query.next),
    ) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "failed to build authorization request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    session.begin_login(request.pending);
    if let Err(e) = gate.store().save(&session).await {
        tracing::error!(error = %e, "failed to save session");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    tracing::debug!(session_id = %session.id(), "redirecting to identity provider");
    (jar.add(gate.session_cookie(&session)), found(request.url.as_str())).into_response()
}

/// Handles the provider's redirect after the user authenticated.
pub async fn authorized(
    State(gate): State<CognitoGate>,
    Query(query): Query<AuthorizedQuery>,
    jar: CookieJar,
) -> Response {
    match complete_login(&gate, query, jar).await {
        Ok(response) => response,
        Err(err) if err.restarts_login() => {
            tracing::info!(error = %err, "login did not complete, starting over");
            gate.login_request()
        }
        Err(err) => err.into_response(),
    }
}

async fn complete_login(
    gate: &CognitoGate,
    query: AuthorizedQuery,
    jar: CookieJar,
) -> Result<Response, CallbackError> {
    let mut session = gate
        .load_session(&jar)
        .await?
        .ok_or(CallbackError::InvalidState)?;

    // A pending login is good for one callback, whatever its outcome.
    let pending = session.take_pending_login();
    if !gate.store().update(&session).await? {
        return Err(CallbackError::InvalidState);
    }

    if let Some(error) = query.error {
        return Err(CallbackError::ProviderDenied {
            error,
            description: query.error_description,
        });
    }

    let pending = pending
        .filter(|p| query.state.as_deref().is_some_and(|state| p.matches(state)))
        .ok_or(CallbackError::InvalidState)?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let token = exchange_code(gate.provider(), gate.http(), &pending, &code)
        .await
        .map_err(|e| match e {
            ExchangeError::InvalidGrant(reason) => CallbackError::InvalidGrant(reason),
            ExchangeError::Failed(reason) => CallbackError::TokenExchange(reason),
        })?;

    // The authenticated session gets a new ID.
    let mut authenticated = gate.new_session();
    authenticated.set_token(token);
    gate.store().save(&authenticated).await?;
    gate.store().delete(session.id()).await?;

    tracing::info!(session_id = %authenticated.id(), "login completed");

    let target = pending.next.unwrap_or_else(|| gate.post_login_target());
    Ok((jar.add(gate.session_cookie(&authenticated)), found(&target)).into_response())
}

/// Ends the session locally and at the provider.
pub async fn logout(
    State(gate): State<CognitoGate>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if let Some(id) = gate.session_id(&jar) {
        if let Err(e) = gate.store().delete(&id).await {
            tracing::error!(session_id = %id, error = %e, "failed to delete session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        tracing::info!(session_id = %id, "logged out");
    }

    let logout_uri = format!("{}{}", gate.public_base(&headers), gate.paths().root());
    let target = gate
        .provider()
        .endpoints()
        .logout_redirect(gate.provider().client_id(), &logout_uri);

    (jar.add(gate.expired_session_cookie()), found(target.as_str())).into_response()
}

/// Accepts only same-origin relative paths as a post-login target.
fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| {
        n.starts_with('/')
            && !n.starts_with("//")
            && !n.contains('\\')
            && !n.chars().any(char::is_control)
    })
}

/// Why the callback could not complete the login.
#[derive(Debug)]
pub enum CallbackError {
    /// No pending login, or the `state` does not match it.
    InvalidState,
    /// The provider redirected back with `?error=`.
    ProviderDenied {
        error: String,
        description: Option<String>,
    },
    /// The callback carried no authorization code.
    MissingCode,
    /// The provider rejected the authorization code.
    InvalidGrant(String),
    /// The code exchange failed for another reason.
    TokenExchange(String),
    /// The session store failed.
    Session(Report<SessionStoreError>),
}

impl CallbackError {
    /// Returns true if the browser should be sent through login again.
    #[must_use]
    pub fn restarts_login(&self) -> bool {
        matches!(
            self,
            Self::InvalidState
                | Self::ProviderDenied { .. }
                | Self::MissingCode
                | Self::InvalidGrant(_)
        )
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState => write!(f, "no pending login matches the callback state"),
            Self::ProviderDenied { error, description } => match description {
                Some(description) => write!(f, "provider returned {error}: {description}"),
                None => write!(f, "provider returned {error}"),
            },
            Self::MissingCode => write!(f, "callback carried no authorization code"),
            Self::InvalidGrant(reason) => write!(f, "authorization code rejected: {reason}"),
            Self::TokenExchange(reason) => write!(f, "token exchange failed: {reason}"),
            Self::Session(report) => write!(f, "session store failed: {report}"),
        }
    }
}

impl From<Report<SessionStoreError>> for CallbackError {
    fn from(report: Report<SessionStoreError>) -> Self {
        Self::Session(report)
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        match &self {
            Self::TokenExchange(_) | Self::Session(_) => {
                tracing::error!(error = %self, "login callback failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed").into_response()
            }
            _ => (StatusCode::BAD_REQUEST, "Invalid login callback").into_response(),
        }
    }
}
