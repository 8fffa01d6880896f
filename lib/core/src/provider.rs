//! Identity provider configuration and endpoint derivation.
//!
//! A Cognito user pool is reached either through a hosted domain prefix,
//! which lives at `{prefix}.auth.{region}.amazoncognito.com`, or through a
//! custom domain that is used as the host verbatim. A domain containing a
//! `.` is treated as a custom domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{ConfigurationError, Result};

/// Scopes requested on every login, before any caller additions.
pub const BASELINE_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Path of the authorization endpoint on the provider host.
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";

/// Path of the token endpoint on the provider host.
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Path of the user info endpoint on the provider host.
pub const USER_INFO_PATH: &str = "/oauth2/userInfo";

/// Path of the hosted UI logout endpoint on the provider host.
pub const LOGOUT_PATH: &str = "/logout";

/// Resolves the provider host for a domain prefix or custom domain.
///
/// # Errors
///
/// Returns `MissingRegion` if `domain` is a bare prefix and no region is
/// given, and `EmptyDomain` if `domain` is blank.
pub fn resolve_host(
    domain: &str,
    region: Option<&str>,
) -> std::result::Result<String, ConfigurationError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ConfigurationError::EmptyDomain);
    }

    if domain.contains('.') {
        return Ok(domain.to_string());
    }

    match region.map(str::trim).filter(|r| !r.is_empty()) {
        Some(region) => Ok(format!("{domain}.auth.{region}.amazoncognito.com")),
        None => Err(ConfigurationError::MissingRegion {
            domain: domain.to_string(),
        }),
    }
}

/// Provider settings as loaded from the environment.
///
/// These are unvalidated; call [`ProviderSettings::into_config`] to obtain
/// an immutable [`ProviderConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Client ID of the Cognito app client.
    pub client_id: String,
    /// Secret of the Cognito app client.
    pub client_secret: String,
    /// Domain prefix of the user pool domain, or the FQDN of a custom domain.
    pub domain: String,
    /// AWS region of the user pool. Required for domain prefixes.
    #[serde(default)]
    pub region: Option<String>,
    /// Extra scopes as a comma-separated string, e.g. "phone,aws.cognito.signin.user.admin".
    #[serde(default)]
    pub additional_scopes: String,
    /// Overrides the derived `https://{host}` base URL (local emulators, tests).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Validates the settings into a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain cannot be resolved or a URL is invalid.
    pub fn into_config(self) -> Result<ProviderConfig, ConfigurationError> {
        let mut builder = ProviderConfig::builder(self.client_id, self.client_secret, self.domain);
        if let Some(region) = self.region {
            builder = builder.region(region);
        }
        if let Some(base_url) = self.base_url.filter(|u| !u.trim().is_empty()) {
            builder = builder.base_url(base_url);
        }
        builder
            .additional_scopes(
                self.additional_scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            )
            .build()
    }
}

/// The set of provider URLs used by the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    base_url: Url,
    authorize_url: Url,
    token_url: Url,
    user_info_url: Url,
    logout_url: Url,
}

impl ProviderEndpoints {
    /// Derives every endpoint from a base URL such as `https://host`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the base is not an absolute http(s) URL.
    pub fn from_base(base: &str) -> std::result::Result<Self, ConfigurationError> {
        let base = base.trim().trim_end_matches('/');
        let parse = |field: &str, raw: String| {
            Url::parse(&raw).map_err(|e| ConfigurationError::InvalidUrl {
                field: field.to_string(),
                reason: format!("{raw}: {e}"),
            })
        };

        let base_url = parse("base_url", base.to_string())?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidUrl {
                field: "base_url".to_string(),
                reason: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }

        Ok(Self {
            authorize_url: parse("authorize_url", format!("{base}{AUTHORIZE_PATH}"))?,
            token_url: parse("token_url", format!("{base}{TOKEN_PATH}"))?,
            user_info_url: parse("user_info_url", format!("{base}{USER_INFO_PATH}"))?,
            logout_url: parse("logout_url", format!("{base}{LOGOUT_PATH}"))?,
            base_url,
        })
    }

    /// Returns the provider base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Returns the user info endpoint.
    #[must_use]
    pub fn user_info_url(&self) -> &Url {
        &self.user_info_url
    }

    /// Returns the bare logout endpoint.
    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    /// Resolves a provider-relative path like `/oauth2/userInfo`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Builds the hosted UI logout URL that sends the browser back to `logout_uri`.
    #[must_use]
    pub fn logout_redirect(&self, client_id: &str, logout_uri: &str) -> Url {
        let mut url = self.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("logout_uri", logout_uri);
        url
    }
}

/// Immutable configuration of the identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    client_id: String,
    client_secret: String,
    host: String,
    scopes: Vec<String>,
    endpoints: ProviderEndpoints,
}

impl ProviderConfig {
    /// Creates a configuration builder with the baseline scopes.
    #[must_use]
    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(client_id, client_secret, domain)
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the resolved provider host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the scopes requested at login.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns the provider endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("host", &self.host)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Builder for `ProviderConfig`.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    client_id: String,
    client_secret: String,
    domain: String,
    region: Option<String>,
    scopes: Vec<String>,
    base_url: Option<String>,
}

impl ProviderConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            domain: domain.into(),
            region: None,
            scopes: BASELINE_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            base_url: None,
        }
    }

    /// Sets the AWS region of the user pool.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Adds a scope to the list of scopes to request.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Adds several scopes, skipping duplicates.
    #[must_use]
    pub fn additional_scopes<I>(self, scopes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        scopes
            .into_iter()
            .fold(self, |builder, scope| builder.add_scope(scope))
    }

    /// Overrides the derived provider base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the `ProviderConfig`.
    ///
    /// # Errors
    ///
    /// Returns `MissingRegion` for a domain prefix without a region,
    /// `EmptyDomain` for a blank domain and `InvalidUrl` for a bad base URL.
    pub fn build(self) -> Result<ProviderConfig, ConfigurationError> {
        let host = resolve_host(&self.domain, self.region.as_deref())?;

        let endpoints = match &self.base_url {
            Some(base_url) => ProviderEndpoints::from_base(base_url)?,
            None => ProviderEndpoints::from_base(&format!("https://{host}"))?,
        };

        tracing::debug!(
            host = %host,
            base_url = %endpoints.base_url(),
            scopes = ?self.scopes,
            "built identity provider configuration"
        );

        Ok(ProviderConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            host,
            scopes: self.scopes,
            endpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_domain_is_used_verbatim_without_region() {
        let config = ProviderConfig::builder("client", "secret", "authentication.example.com")
            .build()
            .expect("custom domain needs no region");

        assert_eq!(config.host(), "authentication.example.com");
        assert_eq!(
            config.endpoints().authorize_url().as_str(),
            "https://authentication.example.com/oauth2/authorize"
        );
    }

    #[test]
    fn custom_domain_ignores_region() {
        let config = ProviderConfig::builder("client", "secret", "auth.example.org")
            .region("us-east-1")
            .build()
            .expect("valid");

        assert_eq!(config.host(), "auth.example.org");
    }

    #[test]
    fn domain_prefix_requires_region() {
        for domain in ["test", "my-app", "prefix123"] {
            let err = resolve_host(domain, None).expect_err("prefix without region");
            assert_eq!(
                err,
                ConfigurationError::MissingRegion {
                    domain: domain.to_string()
                }
            );
            assert!(
                ProviderConfig::builder("client", "secret", domain)
                    .build()
                    .is_err()
            );
        }
    }

    #[test]
    fn blank_region_counts_as_missing() {
        assert!(matches!(
            resolve_host("test", Some("  ")),
            Err(ConfigurationError::MissingRegion { .. })
        ));
    }

    #[test]
    fn domain_prefix_with_region_builds_hosted_domain() {
        let config = ProviderConfig::builder("client", "secret", "test")
            .region("eu-central-1")
            .build()
            .expect("valid");

        assert_eq!(config.host(), "test.auth.eu-central-1.amazoncognito.com");
        let endpoints = config.endpoints();
        assert_eq!(
            endpoints.base_url().as_str(),
            "https://test.auth.eu-central-1.amazoncognito.com/"
        );
        assert_eq!(
            endpoints.token_url().as_str(),
            "https://test.auth.eu-central-1.amazoncognito.com/oauth2/token"
        );
        assert_eq!(
            endpoints.user_info_url().as_str(),
            "https://test.auth.eu-central-1.amazoncognito.com/oauth2/userInfo"
        );
        assert_eq!(
            endpoints.logout_url().as_str(),
            "https://test.auth.eu-central-1.amazoncognito.com/logout"
        );
    }

    #[test]
    fn empty_domain_is_rejected() {
        assert_eq!(resolve_host("   ", Some("eu-west-1")), Err(ConfigurationError::EmptyDomain));
    }

    #[test]
    fn scopes_start_with_baseline_and_deduplicate() {
        let config = ProviderConfig::builder("client", "secret", "auth.example.com")
            .add_scope("email")
            .additional_scopes(["phone", "aws.cognito.signin.user.admin", "phone"])
            .build()
            .expect("valid");

        assert_eq!(
            config.scopes(),
            [
                "openid",
                "email",
                "profile",
                "phone",
                "aws.cognito.signin.user.admin"
            ]
        );
    }

    #[test]
    fn base_url_override_replaces_derived_host_url() {
        let config = ProviderConfig::builder("client", "secret", "test")
            .region("eu-central-1")
            .base_url("http://127.0.0.1:9229/")
            .build()
            .expect("valid");

        assert_eq!(config.host(), "test.auth.eu-central-1.amazoncognito.com");
        assert_eq!(
            config.endpoints().token_url().as_str(),
            "http://127.0.0.1:9229/oauth2/token"
        );
    }

    #[test]
    fn base_url_must_be_http() {
        let err = ProviderEndpoints::from_base("ftp://example.com").expect_err("bad scheme");
        assert!(matches!(err, ConfigurationError::InvalidUrl { .. }));
    }

    #[test]
    fn logout_redirect_encodes_target() {
        let endpoints = ProviderEndpoints::from_base("https://auth.example.com").expect("valid");
        let url = endpoints.logout_redirect("testclient", "http://localhost/some/prefix/");

        assert_eq!(
            url.as_str(),
            "https://auth.example.com/logout?client_id=testclient\
             &logout_uri=http%3A%2F%2Flocalhost%2Fsome%2Fprefix%2F"
        );
    }

    #[test]
    fn url_for_joins_relative_paths() {
        let endpoints = ProviderEndpoints::from_base("https://auth.example.com/").expect("valid");
        assert_eq!(
            endpoints.url_for("/oauth2/userInfo"),
            "https://auth.example.com/oauth2/userInfo"
        );
        assert_eq!(
            endpoints.url_for("oauth2/userInfo"),
            "https://auth.example.com/oauth2/userInfo"
        );
    }

    #[test]
    fn settings_parse_comma_separated_scopes() {
        let json = r#"{
            "client_id": "client",
            "client_secret": "secret",
            "domain": "test",
            "region": "eu-west-1",
            "additional_scopes": "phone, aws.cognito.signin.user.admin,"
        }"#;

        let settings: ProviderSettings = serde_json::from_str(json).expect("deserialize");
        let config = settings.into_config().expect("valid");

        assert_eq!(config.host(), "test.auth.eu-west-1.amazoncognito.com");
        assert!(config.scopes().iter().any(|s| s == "phone"));
        assert!(
            config
                .scopes()
                .iter()
                .any(|s| s == "aws.cognito.signin.user.admin")
        );
        assert_eq!(config.scopes().len(), 5);
    }

    #[test]
    fn settings_without_region_fail_for_prefix() {
        let json = r#"{
            "client_id": "client",
            "client_secret": "secret",
            "domain": "test"
        }"#;

        let settings: ProviderSettings = serde_json::from_str(json).expect("deserialize");
        assert!(settings.into_config().is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = ProviderConfig::builder("client", "super-secret", "auth.example.com")
            .build()
            .expect("valid");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
