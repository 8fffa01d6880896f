//! Authenticated identity and the outcome of an authorization check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigurationError, GrantError, ProviderError};

/// Session attribute holding the user's email address.
pub const EMAIL_ATTRIBUTE: &str = "email";

/// Maps user info claims onto session attribute names.
///
/// The default maps the `email` claim to the `email` attribute. A mapping
/// can be parsed from `"email:email,sub:user_id"`; an entry without a colon
/// keeps the claim name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    entries: Vec<(String, String)>,
}

impl AttributeMapping {
    /// Creates a mapping from `(claim, attribute)` pairs.
    #[must_use]
    pub fn new<I, C, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, A)>,
        C: Into<String>,
        A: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(claim, attr)| (claim.into(), attr.into()))
                .collect(),
        }
    }

    /// Returns the `(claim, attribute)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, a)| (c.as_str(), a.as_str()))
    }

    /// Extracts the mapped claims from a user info response.
    ///
    /// # Errors
    ///
    /// Returns `MissingClaim` if a mapped claim is absent or null.
    pub fn apply(&self, claims: &Map<String, Value>) -> Result<Identity, ProviderError> {
        let mut attributes = BTreeMap::new();
        for (claim, attribute) in self.entries() {
            let value = match claims.get(claim) {
                None | Some(Value::Null) => {
                    return Err(ProviderError::MissingClaim {
                        claim: claim.to_string(),
                    });
                }
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            attributes.insert(attribute.to_string(), value);
        }
        Ok(Identity { attributes })
    }
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self::new([(EMAIL_ATTRIBUTE, EMAIL_ATTRIBUTE)])
    }
}

impl FromStr for AttributeMapping {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for raw in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (claim, attribute) = match raw.split_once(':') {
                Some((claim, attribute)) => (claim.trim(), attribute.trim()),
                None => (raw, raw),
            };
            if claim.is_empty() || attribute.is_empty() {
                return Err(ConfigurationError::InvalidAttributeMapping {
                    entry: raw.to_string(),
                });
            }
            entries.push((claim.to_string(), attribute.to_string()));
        }

        if entries.is_empty() {
            return Err(ConfigurationError::InvalidAttributeMapping {
                entry: s.to_string(),
            });
        }
        Ok(Self { entries })
    }
}

/// The identity attributes cached in a session after a user info lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity {
    attributes: BTreeMap<String, String>,
}

impl Identity {
    /// Creates an identity from attribute pairs.
    #[must_use]
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the user's email address, if it is mapped.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_ATTRIBUTE)
    }

    /// Returns a session attribute by name.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    /// Returns all attributes.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Where a request stands in the login flow.
///
/// This is inferred from the session on every request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No usable token.
    Unauthenticated,
    /// A token exists but the provider has not confirmed it for this request.
    PendingVerification,
    /// The provider confirmed the token during this request.
    Authenticated,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::PendingVerification => write!(f, "pending_verification"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Why a request is not authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No session cookie, or the session is unknown or expired.
    NoSession,
    /// The session holds no token.
    NoToken,
    /// The token was rejected or expired; it has been removed.
    Grant(GrantError),
}

impl fmt::Display for UnauthenticatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "no session"),
            Self::NoToken => write!(f, "no token"),
            Self::Grant(err) => write!(f, "{err}"),
        }
    }
}

/// Result of checking whether a request may reach a protected handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The provider confirmed the token; the identity is fresh.
    Authenticated(Identity),
    /// The request must log in first.
    Unauthenticated(UnauthenticatedReason),
    /// The provider failed in a way that is not a grant problem.
    ProviderError(ProviderError),
}

impl AuthOutcome {
    /// Returns the login state this outcome settles on.
    #[must_use]
    pub fn state(&self) -> AuthState {
        match self {
            Self::Authenticated(_) => AuthState::Authenticated,
            Self::Unauthenticated(_) => AuthState::Unauthenticated,
            Self::ProviderError(_) => AuthState::PendingVerification,
        }
    }
}
