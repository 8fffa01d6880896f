//! Session records for the login flow.
//!
//! A session is created when a browser first starts a login and is keyed by
//! an opaque ID carried in a cookie. It holds the pending login while the
//! browser is at the provider, then the OAuth2 token and the identity
//! attributes confirmed by the last user info lookup.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{AuthState, Identity};

/// Unique identifier for a session.
///
/// Session IDs are opaque strings generated during session creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Generates a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// OAuth2 token obtained from the code exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Creates a token, computing the absolute expiry from `expires_in`.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<std::time::Duration>,
    ) -> Self {
        let expires_at = expires_in
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Returns the bearer credential.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if the provider issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Returns when the access token expires, if known.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// State issued for one login attempt, consumed by the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// CSRF `state` sent to the provider.
    pub csrf_state: String,
    /// PKCE verifier matching the challenge sent to the provider.
    pub pkce_verifier: String,
    /// The `redirect_uri` sent to the provider; the exchange must repeat it.
    pub redirect_uri: String,
    /// Where to send the browser after login, if the caller asked.
    pub next: Option<String>,
}

impl PendingLogin {
    /// Returns true if `state` is the one issued for this login.
    #[must_use]
    pub fn matches(&self, state: &str) -> bool {
        !state.is_empty() && self.csrf_state == state
    }
}

/// A browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    token: Option<StoredToken>,
    identity: Option<Identity>,
    pending_login: Option<PendingLogin>,
}

impl Session {
    /// Creates an empty session valid for `duration`.
    #[must_use]
    pub fn new(id: SessionId, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            expires_at: now + duration,
            token: None,
            identity: None,
            pending_login: None,
        }
    }

    /// Returns the session ID.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns the stored token.
    #[must_use]
    pub fn token(&self) -> Option<&StoredToken> {
        self.token.as_ref()
    }

    /// Stores a new token. The cached identity belongs to the old token and is dropped.
    pub fn set_token(&mut self, token: StoredToken) {
        self.token = Some(token);
        self.identity = None;
    }

    /// Drops the token together with the identity it vouched for.
    pub fn clear_token(&mut self) {
        self.token = None;
        self.identity = None;
    }

    /// Returns the identity cached by the last successful check.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Caches the identity confirmed by the provider.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Returns a cached identity attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.get(name))
    }

    /// Returns the cached email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().and_then(Identity::email)
    }

    /// Records a new login attempt, replacing any earlier one.
    pub fn begin_login(&mut self, pending: PendingLogin) {
        self.pending_login = Some(pending);
    }

    /// Removes and returns the pending login. A second call returns `None`.
    pub fn take_pending_login(&mut self) -> Option<PendingLogin> {
        self.pending_login.take()
    }

    /// Returns the login state implied by the session contents alone.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        match &self.token {
            Some(token) if !token.is_expired() => AuthState::PendingVerification,
            _ => AuthState::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in_secs: Option<u64>) -> StoredToken {
        StoredToken::new(
            "access_token_123".to_string(),
            Some("refresh_token_456".to_string()),
            expires_in_secs.map(std::time::Duration::from_secs),
        )
    }

    fn pending() -> PendingLogin {
        PendingLogin {
            csrf_state: "vSBCqedXdyXQAOcr".to_string(),
            pkce_verifier: "verifier".to_string(),
            redirect_uri: "http://localhost/login/authorized".to_string(),
            next: None,
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn session_id_display() {
        let id: SessionId = "sess_test_123".into();
        assert_eq!(id.to_string(), "sess_test_123");
        assert_eq!(id.as_str(), "sess_test_123");
    }

    #[test]
    fn new_session_is_unauthenticated() {
        let session = Session::new(SessionId::generate(), Duration::hours(1));

        assert!(!session.is_expired());
        assert!(session.token().is_none());
        assert!(session.email().is_none());
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
    }

    #[test]
    fn session_expiration() {
        let session = Session::new(SessionId::generate(), Duration::seconds(-1));
        assert!(session.is_expired());
    }

    #[test]
    fn token_moves_session_to_pending_verification() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.set_token(token(Some(3600)));

        assert_eq!(session.auth_state(), AuthState::PendingVerification);
        assert_eq!(
            session.token().map(StoredToken::access_token),
            Some("access_token_123")
        );
    }

    #[test]
    fn token_expiry() {
        assert!(!token(Some(3600)).is_expired());
        assert!(token(Some(0)).is_expired());
        assert!(!token(None).is_expired());
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.set_token(token(Some(0)));
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
    }

    #[test]
    fn new_token_drops_cached_identity() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.set_token(token(Some(3600)));
        session.set_identity(Identity::from_attributes([("email", "alice@example.com")]));
        assert_eq!(session.email(), Some("alice@example.com"));

        session.set_token(token(Some(3600)));
        assert!(session.email().is_none());
    }

    #[test]
    fn clear_token_drops_identity() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.set_token(token(Some(3600)));
        session.set_identity(Identity::from_attributes([("user_id", "42")]));

        session.clear_token();
        assert!(session.token().is_none());
        assert!(session.attribute("user_id").is_none());
    }

    #[test]
    fn pending_login_is_consumed_once() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.begin_login(pending());

        let taken = session.take_pending_login().expect("pending login");
        assert!(taken.matches("vSBCqedXdyXQAOcr"));
        assert!(!taken.matches("other"));
        assert!(!taken.matches(""));
        assert!(session.take_pending_login().is_none());
    }

    #[test]
    fn token_debug_redacts_secret() {
        let debug = format!("{:?}", token(Some(60)));
        assert!(!debug.contains("access_token_123"));
        assert!(!debug.contains("refresh_token_456"));
    }

    #[test]
    fn session_serialization_roundtrip() {
        let mut session = Session::new(SessionId::generate(), Duration::hours(1));
        session.set_token(token(Some(3600)));
        session.begin_login(pending());

        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, session);
    }
}
