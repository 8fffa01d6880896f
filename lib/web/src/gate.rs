//! Middleware that keeps unauthenticated requests away from protected handlers.
//!
//! The login state is inferred from the session on every request:
//!
//! - no usable token: unauthenticated, no provider call
//! - a token: the user info endpoint decides, and the identity it returns is
//!   cached in the session before the handler runs
//!
//! [`require_login`] guards the application's entry point and sends
//! unauthenticated browsers into the login flow. [`require_auth`] guards
//! everything else and answers 403.

use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use cognito_gate_core::{AuthOutcome, Identity, Session, SessionStoreError, UnauthenticatedReason};
use rootcause::Report;

use crate::config::ProviderErrorPolicy;
use crate::proxy::{Cognito, ProxyError};
use crate::state::CognitoGate;

/// Builds a `302 Found` redirect. axum's `Redirect::to` answers 303.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location, "redirect target is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl CognitoGate {
    /// Checks the session's token against the provider.
    ///
    /// On success the mapped identity attributes are written into the session.
    /// A rejected or expired token is removed from the session together with
    /// the cached identity. The session is written back unless the provider
    /// failed, and only if it still exists: a session deleted by a concurrent
    /// logout stays deleted and the request is unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails.
    pub async fn is_authorized(
        &self,
        session: Option<&mut Session>,
    ) -> Result<AuthOutcome, Report<SessionStoreError>> {
        let Some(session) = session else {
            return Ok(AuthOutcome::Unauthenticated(UnauthenticatedReason::NoSession));
        };
        let Some(token) = session.token().cloned() else {
            return Ok(AuthOutcome::Unauthenticated(UnauthenticatedReason::NoToken));
        };
        tracing::trace!(session_id = %session.id(), state = %session.auth_state(), "verifying token");

        let outcome = match Cognito::new(self.clone(), Some(token)).user_info().await {
            Ok(claims) => match self.attribute_mapping().apply(&claims) {
                Ok(identity) => {
                    session.set_identity(identity.clone());
                    AuthOutcome::Authenticated(identity)
                }
                Err(err) => AuthOutcome::ProviderError(err),
            },
            Err(ProxyError::Grant(err)) => {
                tracing::info!(session_id = %session.id(), error = %err, "dropping rejected token");
                session.clear_token();
                AuthOutcome::Unauthenticated(UnauthenticatedReason::Grant(err))
            }
            Err(ProxyError::Provider(err)) => AuthOutcome::ProviderError(err),
        };

        if matches!(outcome, AuthOutcome::ProviderError(_)) {
            return Ok(outcome);
        }
        if !self.store().update(session).await? {
            tracing::debug!(session_id = %session.id(), "session ended during verification");
            session.clear_token();
            return Ok(AuthOutcome::Unauthenticated(UnauthenticatedReason::NoSession));
        }
        Ok(outcome)
    }

    /// Redirects the browser to the login route.
    #[must_use]
    pub fn login_request(&self) -> Response {
        found(self.paths().login())
    }

    /// Redirects the browser to the login route, asking to come back to
    /// `target` afterwards. The mount root needs no `next`.
    #[must_use]
    pub fn login_request_for(&self, target: &str) -> Response {
        if target == self.paths().root() {
            return self.login_request();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("next", target)
            .finish();
        found(&format!("{}?{query}", self.paths().login()))
    }

    /// Guards the application's entry point: unauthenticated requests are
    /// redirected to the login route.
    pub fn protect_index<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self.clone(), require_login))
    }

    /// Guards other handlers: unauthenticated requests get 403.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self.clone(), require_auth))
    }
}

/// What an unauthenticated request gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denial {
    Login,
    Forbidden,
}

/// Middleware for the entry point. Unauthenticated requests are sent to login.
pub async fn require_login(
    State(gate): State<CognitoGate>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    gated(gate, jar, request, next, Denial::Login).await
}

/// Middleware for protected handlers. Unauthenticated requests get 403.
pub async fn require_auth(
    State(gate): State<CognitoGate>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    gated(gate, jar, request, next, Denial::Forbidden).await
}

async fn gated(
    gate: CognitoGate,
    jar: CookieJar,
    mut request: Request,
    next: Next,
    denial: Denial,
) -> Response {
    let mut session = match gate.load_session(&jar).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let outcome = match gate.is_authorized(session.as_mut()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "failed to save session");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let state = outcome.state();
    let reason = match outcome {
        AuthOutcome::Authenticated(identity) => {
            let token = session.as_ref().and_then(|s| s.token().cloned());
            request.extensions_mut().insert(identity);
            request
                .extensions_mut()
                .insert(Cognito::new(gate.clone(), token));
            return next.run(request).await;
        }
        AuthOutcome::Unauthenticated(reason) => reason.to_string(),
        AuthOutcome::ProviderError(err) => match gate.provider_error_policy() {
            ProviderErrorPolicy::Fail => {
                tracing::error!(error = %err, "user info lookup failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
            ProviderErrorPolicy::Deny => {
                tracing::warn!(error = %err, "user info lookup failed, denying request");
                err.to_string()
            }
        },
    };

    tracing::debug!(path = %request.uri().path(), %state, %reason, "request not authenticated");
    match denial {
        Denial::Login => {
            let target = request
                .uri()
                .path_and_query()
                .map_or_else(|| request.uri().path(), |pq| pq.as_str());
            gate.login_request_for(target)
        }
        Denial::Forbidden => AuthRejection::NotAuthenticated.into_response(),
    }
}

/// The identity the gate confirmed for this request.
///
/// Only available to handlers behind [`require_login`] or [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthRejection::NotAuthenticated)
    }
}

/// Rejection type for the gate's extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        }
    }
}
