//! Shared gate state.

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cognito_gate_core::{
    AttributeMapping, ConfigurationError, MemorySessionStore, ProviderConfig, Session, SessionId,
    SessionStore, SessionStoreError,
};
use rootcause::Report;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use time::Duration as TimeDuration;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{GateSettings, ProviderErrorPolicy, SessionConfig};
use crate::paths::MountPaths;

/// Max-Age given to the session cookie on logout.
const EXPIRED_COOKIE_MAX_AGE_SECONDS: i64 = -3600;

/// Everything the login routes and the gate middleware share.
///
/// Cheap to clone; use it as axum state.
#[derive(Clone)]
pub struct CognitoGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    provider: ProviderConfig,
    paths: MountPaths,
    mapping: AttributeMapping,
    redirect_url: Option<String>,
    public_url: Option<String>,
    on_provider_error: ProviderErrorPolicy,
    session: SessionConfig,
    store: Arc<dyn SessionStore>,
    http: reqwest::Client,
}

impl CognitoGate {
    /// Creates the gate.
    ///
    /// # Errors
    ///
    /// Returns an error if a path, URL or attribute mapping in `settings` is
    /// invalid, or if the HTTP client cannot be built.
    pub fn new(
        provider: ProviderConfig,
        settings: GateSettings,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, Report<ConfigurationError>> {
        let paths = MountPaths::new(
            &settings.mount_prefix,
            &settings.login_path,
            settings.logout_path.as_deref(),
        )?;

        let mapping: AttributeMapping = settings.session_attributes.parse()?;

        let public_url = match settings.public_url.filter(|u| !u.trim().is_empty()) {
            Some(raw) => {
                let parsed = Url::parse(raw.trim()).map_err(|e| ConfigurationError::InvalidUrl {
                    field: "public_url".to_string(),
                    reason: format!("{raw}: {e}"),
                })?;
                Some(parsed.origin().ascii_serialization())
            }
            None => None,
        };

        let mut http = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(seconds) = settings.request_timeout_seconds {
            http = http.timeout(StdDuration::from_secs(seconds));
        }
        let http = http.build().map_err(|e| ConfigurationError::HttpClient {
            reason: e.to_string(),
        })?;

        tracing::info!(
            provider_host = %provider.host(),
            login = %paths.login(),
            logout = ?paths.logout(),
            "configured Cognito gate"
        );

        Ok(Self {
            inner: Arc::new(GateInner {
                provider,
                paths,
                mapping,
                redirect_url: settings.redirect_url.filter(|u| !u.trim().is_empty()),
                public_url,
                on_provider_error: settings.on_provider_error,
                session: settings.session,
                store,
                http,
            }),
        })
    }

    /// Creates the gate backed by a fresh in-memory session store.
    ///
    /// Expired sessions stay in memory until removed; run
    /// [`CognitoGate::spawn_session_cleanup`] alongside the server.
    ///
    /// # Errors
    ///
    /// See [`CognitoGate::new`].
    pub fn with_memory_store(
        provider: ProviderConfig,
        settings: GateSettings,
    ) -> Result<Self, Report<ConfigurationError>> {
        Self::new(provider, settings, Arc::new(MemorySessionStore::new()))
    }

    /// Returns the provider configuration.
    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.inner.provider
    }

    /// Returns the route paths.
    #[must_use]
    pub fn paths(&self) -> &MountPaths {
        &self.inner.paths
    }

    /// Returns the user info to session attribute mapping.
    #[must_use]
    pub fn attribute_mapping(&self) -> &AttributeMapping {
        &self.inner.mapping
    }

    /// Returns the policy for unexpected provider failures.
    #[must_use]
    pub fn provider_error_policy(&self) -> ProviderErrorPolicy {
        self.inner.on_provider_error
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.session
    }

    /// Returns the session store.
    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.inner.store.as_ref()
    }

    /// Returns the HTTP client used for provider calls.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Returns where the browser goes after a login without `next`.
    #[must_use]
    pub fn post_login_target(&self) -> String {
        self.inner
            .redirect_url
            .clone()
            .unwrap_or_else(|| self.inner.paths.root())
    }

    /// Returns the scheme and host the browser sees, without a trailing slash.
    pub(crate) fn public_base(&self, headers: &HeaderMap) -> String {
        if let Some(public_url) = &self.inner.public_url {
            return public_url.clone();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|s| matches!(*s, "http" | "https"))
            .unwrap_or("http");

        format!("{scheme}://{host}")
    }

    /// Returns the absolute callback URL handed to the provider.
    pub(crate) fn redirect_uri(&self, headers: &HeaderMap) -> String {
        format!("{}{}", self.public_base(headers), self.inner.paths.authorized())
    }

    /// Creates an empty session with the configured lifetime.
    pub(crate) fn new_session(&self) -> Session {
        Session::new(
            SessionId::generate(),
            chrono::Duration::minutes(self.inner.session.duration_minutes),
        )
    }

    /// Creates a session for a browser that has only started logging in.
    pub(crate) fn new_pending_session(&self) -> Session {
        Session::new(
            SessionId::generate(),
            chrono::Duration::minutes(self.inner.session.pending_login_ttl_minutes),
        )
    }

    /// Spawns a task that deletes expired sessions every
    /// `cleanup_interval_seconds`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_session_cleanup(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.inner.store);
        let period = StdDuration::from_secs(self.inner.session.cleanup_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match store.delete_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                    }
                }
            }
        })
    }

    /// Loads the session named by the request's cookie.
    ///
    /// Expired sessions are deleted and reported as absent.
    pub(crate) async fn load_session(
        &self,
        jar: &CookieJar,
    ) -> Result<Option<Session>, Report<SessionStoreError>> {
        let Some(id) = self.session_id(jar) else {
            return Ok(None);
        };

        match self.store().load(&id).await? {
            Some(session) if session.is_expired() => {
                tracing::debug!(session_id = %id, "session expired");
                self.store().delete(&id).await?;
                Ok(None)
            }
            Some(session) => Ok(Some(session)),
            None => {
                tracing::debug!(session_id = %id, "session cookie names unknown session");
                Ok(None)
            }
        }
    }

    /// Returns the session ID carried by the request's cookie.
    pub(crate) fn session_id(&self, jar: &CookieJar) -> Option<SessionId> {
        jar.get(&self.inner.session.cookie_name)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .map(SessionId::from)
    }

    /// Builds the cookie carrying a session ID.
    pub(crate) fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        Cookie::build((
            self.inner.session.cookie_name.clone(),
            session.id().as_str().to_string(),
        ))
        .path(self.inner.paths.cookie_path().to_string())
        .http_only(true)
        .secure(self.inner.session.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::seconds(
            (session.expires_at() - chrono::Utc::now()).num_seconds().max(0),
        ))
        .build()
    }

    /// Builds the cookie that makes the browser drop its session.
    pub(crate) fn expired_session_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.inner.session.cookie_name.clone(), ""))
            .path(self.inner.paths.cookie_path().to_string())
            .http_only(true)
            .secure(self.inner.session.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(EXPIRED_COOKIE_MAX_AGE_SECONDS))
            .build()
    }
}
