//! Route paths relative to the host application's mount prefix.

use cognito_gate_core::ConfigurationError;

/// Suffix appended to the login path for the provider callback.
const AUTHORIZED_SUFFIX: &str = "authorized";

/// The paths the gate answers on and redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPaths {
    prefix: String,
    login: String,
    authorized: String,
    logout: Option<String>,
}

impl MountPaths {
    /// Normalizes the prefix and derives the route paths.
    ///
    /// `"/some/prefix/"`, `"some/prefix"` and `"/some/prefix"` are the same
    /// prefix; `""` and `"/"` mount at the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for an empty login path or a path containing
    /// a query or fragment.
    pub fn new(
        prefix: &str,
        login_path: &str,
        logout_path: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        let prefix = normalize_prefix(prefix)?;

        let login_segment = segment(login_path)?;
        if login_segment.is_empty() {
            return Err(ConfigurationError::InvalidPath {
                path: login_path.to_string(),
                reason: "login path must not be empty".to_string(),
            });
        }

        let login = format!("{prefix}/{login_segment}");
        let authorized = format!("{login}/{AUTHORIZED_SUFFIX}");

        let logout = match logout_path {
            Some(path) => {
                let logout_segment = segment(path)?;
                if logout_segment.is_empty() {
                    return Err(ConfigurationError::InvalidPath {
                        path: path.to_string(),
                        reason: "logout path must not be empty".to_string(),
                    });
                }
                Some(format!("{prefix}/{logout_segment}"))
            }
            None => None,
        };

        Ok(Self {
            prefix,
            login,
            authorized,
            logout,
        })
    }

    /// Returns the normalized prefix, empty when mounted at the root.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the application root, always ending in `/`.
    #[must_use]
    pub fn root(&self) -> String {
        format!("{}/", self.prefix)
    }

    /// Returns the login route.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns the provider callback route.
    #[must_use]
    pub fn authorized(&self) -> &str {
        &self.authorized
    }

    /// Returns the logout route, if configured.
    #[must_use]
    pub fn logout(&self) -> Option<&str> {
        self.logout.as_deref()
    }

    /// Returns the path the session cookie is scoped to.
    #[must_use]
    pub fn cookie_path(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, ConfigurationError> {
    let trimmed = segment(prefix)?;
    if trimmed.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

fn segment(path: &str) -> Result<&str, ConfigurationError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.contains(['?', '#']) || trimmed.contains("//") {
        return Err(ConfigurationError::InvalidPath {
            path: path.to_string(),
            reason: "path must not contain a query, fragment or empty segment".to_string(),
        });
    }
    Ok(trimmed)
}
