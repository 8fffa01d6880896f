//! Gate configuration.
//!
//! Loaded by the host through the `config` crate alongside
//! [`ProviderSettings`](cognito_gate_core::ProviderSettings); every field has
//! a default so only the provider settings are mandatory.

use serde::Deserialize;

/// Settings for the routes and middleware mounted into the host app.
#[derive(Debug, Clone, Deserialize)]
pub struct GateSettings {
    /// Path prefix the host application is mounted under, e.g. "/some/prefix".
    #[serde(default)]
    pub mount_prefix: String,

    /// Path of the login route below the prefix. The callback lives at
    /// `{login_path}/authorized`.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Path of the logout route below the prefix. No route when unset.
    #[serde(default)]
    pub logout_path: Option<String>,

    /// Where to send the browser after login. Defaults to the mount root.
    #[serde(default)]
    pub redirect_url: Option<String>,

    /// Public scheme and host of the application, e.g. "https://app.example.com".
    /// Derived from the request's Host header when unset.
    #[serde(default)]
    pub public_url: Option<String>,

    /// User info claims cached in the session, as "claim:attribute" pairs.
    #[serde(default = "default_session_attributes")]
    pub session_attributes: String,

    /// What a gated request gets when the user info call fails unexpectedly.
    #[serde(default)]
    pub on_provider_error: ProviderErrorPolicy,

    /// Timeout for calls to the identity provider. No timeout when unset.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// Session cookie and lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_login_path() -> String {
    "login".to_string()
}

fn default_session_attributes() -> String {
    "email:email".to_string()
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            mount_prefix: String::new(),
            login_path: default_login_path(),
            logout_path: None,
            redirect_url: None,
            public_url: None,
            session_attributes: default_session_attributes(),
            on_provider_error: ProviderErrorPolicy::default(),
            request_timeout_seconds: None,
            session: SessionConfig::default(),
        }
    }
}

/// Handling of user info failures that are not grant errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderErrorPolicy {
    /// Answer 500 and log the failure.
    #[default]
    Fail,
    /// Treat the request as unauthenticated.
    Deny,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Lifetime in minutes of a session that has started a login but not
    /// completed it.
    #[serde(default = "default_pending_login_ttl_minutes")]
    pub pending_login_ttl_minutes: i64,

    /// Interval between session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_session_duration_minutes() -> i64 {
    480
}

fn default_pending_login_ttl_minutes() -> i64 {
    10
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

fn default_cookie_name() -> String {
    "session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            pending_login_ttl_minutes: default_pending_login_ttl_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
            cookie_name: default_cookie_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.duration_minutes, 480);
        assert_eq!(config.pending_login_ttl_minutes, 10);
        assert_eq!(config.cleanup_interval_seconds, 300);
        assert!(config.secure_cookies);
        assert_eq!(config.cookie_name, "session");
    }

    #[test]
    fn empty_settings_deserialize_to_defaults() {
        let settings: GateSettings = serde_json::from_str("{}").expect("deserialize");

        assert_eq!(settings.mount_prefix, "");
        assert_eq!(settings.login_path, "login");
        assert!(settings.logout_path.is_none());
        assert_eq!(settings.session_attributes, "email:email");
        assert_eq!(settings.on_provider_error, ProviderErrorPolicy::Fail);
        assert!(settings.request_timeout_seconds.is_none());
        assert_eq!(settings.session.cookie_name, "session");
    }

    #[test]
    fn provider_error_policy_parses_lowercase() {
        let settings: GateSettings = serde_json::from_str(
            r#"{ "on_provider_error": "deny", "logout_path": "logout" }"#,
        )
        .expect("deserialize");

        assert_eq!(settings.on_provider_error, ProviderErrorPolicy::Deny);
        assert_eq!(settings.logout_path.as_deref(), Some("logout"));
    }
}
