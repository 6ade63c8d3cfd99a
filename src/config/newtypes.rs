//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear
//! error messages before any request is issued.

use crate::error::ConfigError;
use std::fmt;

/// A validated OData service root URL.
///
/// The service root is the absolute URL that all resource paths are resolved
/// against, e.g. `https://services.odata.org/V4/TripPinService`. A trailing
/// slash is stripped so path joining is unambiguous.
///
/// # Example
///
/// ```rust
/// use odata_client::ServiceRootUrl;
///
/// let root = ServiceRootUrl::new("https://services.odata.org/V4/TripPinService/").unwrap();
/// assert_eq!(root.as_ref(), "https://services.odata.org/V4/TripPinService");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRootUrl(String);

impl ServiceRootUrl {
    /// Creates a new validated service root URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServiceRoot`] if the URL is empty, has
    /// no `http`/`https` scheme, or has no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();

        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        let valid = rest.is_some_and(|rest| {
            let host = rest.split('/').next().unwrap_or_default();
            !host.is_empty() && !host.contains(char::is_whitespace)
        });
        if !valid {
            return Err(ConfigError::InvalidServiceRoot { url });
        }

        Ok(Self(url.trim_end_matches('/').to_string()))
    }

    /// Joins a relative resource path onto the service root.
    ///
    /// # Example
    ///
    /// ```rust
    /// use odata_client::ServiceRootUrl;
    ///
    /// let root = ServiceRootUrl::new("https://example.org/api").unwrap();
    /// assert_eq!(root.join("People('1')"), "https://example.org/api/People('1')");
    /// ```
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl AsRef<str> for ServiceRootUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceRootUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential policy applied by the HTTP transport.
///
/// Credentials are a static header policy: the transport translates the
/// variant into an `Authorization` header on every request. Secret values
/// are masked in debug output to prevent accidental exposure in logs.
///
/// # Example
///
/// ```rust
/// use odata_client::Credentials;
///
/// let creds = Credentials::bearer("token-123").unwrap();
/// assert_eq!(format!("{creds:?}"), "Credentials::Bearer(*****)");
/// ```
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No authentication.
    #[default]
    Anonymous,
    /// Bearer token authentication (`Authorization: Bearer <token>`).
    Bearer(String),
    /// Basic authentication (`Authorization: Basic <base64(user:password)>`).
    Basic {
        /// The user name.
        username: String,
        /// The password.
        password: String,
    },
}

impl Credentials {
    /// Creates bearer-token credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if the token is empty.
    pub fn bearer(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ConfigError::EmptyCredential { field: "token" });
        }
        Ok(Self::Bearer(token))
    }

    /// Creates basic-auth credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if the username is empty.
    pub fn basic(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ConfigError::EmptyCredential { field: "username" });
        }
        Ok(Self::Basic {
            username,
            password: password.into(),
        })
    }

    /// Returns `true` if no authentication is configured.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Credentials::Anonymous"),
            Self::Bearer(_) => f.write_str("Credentials::Bearer(*****)"),
            Self::Basic { username, .. } => {
                write!(f, "Credentials::Basic({username}, *****)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_root_accepts_https_url() {
        let root = ServiceRootUrl::new("https://example.org/odata").unwrap();
        assert_eq!(root.as_ref(), "https://example.org/odata");
    }

    #[test]
    fn test_service_root_strips_trailing_slash() {
        let root = ServiceRootUrl::new("https://example.org/odata/").unwrap();
        assert_eq!(root.as_ref(), "https://example.org/odata");
    }

    #[test]
    fn test_service_root_rejects_missing_scheme() {
        assert!(matches!(
            ServiceRootUrl::new("example.org/odata"),
            Err(ConfigError::InvalidServiceRoot { .. })
        ));
    }

    #[test]
    fn test_service_root_rejects_empty_host() {
        assert!(ServiceRootUrl::new("https:///odata").is_err());
        assert!(ServiceRootUrl::new("").is_err());
    }

    #[test]
    fn test_join_normalizes_separators() {
        let root = ServiceRootUrl::new("https://example.org/odata").unwrap();
        assert_eq!(root.join("People"), "https://example.org/odata/People");
        assert_eq!(root.join("/People"), "https://example.org/odata/People");
    }

    #[test]
    fn test_bearer_rejects_empty_token() {
        assert!(matches!(
            Credentials::bearer(""),
            Err(ConfigError::EmptyCredential { field: "token" })
        ));
    }

    #[test]
    fn test_basic_rejects_empty_username() {
        assert!(Credentials::basic("", "pw").is_err());
        assert!(Credentials::basic("user", "").is_ok());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let bearer = Credentials::bearer("secret-token").unwrap();
        assert!(!format!("{bearer:?}").contains("secret-token"));

        let basic = Credentials::basic("user", "secret-pw").unwrap();
        let debug = format!("{basic:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret-pw"));
    }

    #[test]
    fn test_default_is_anonymous() {
        assert!(Credentials::default().is_anonymous());
    }
}
