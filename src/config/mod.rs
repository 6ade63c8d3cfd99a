//! Configuration types for the OData client.
//!
//! This module provides the core configuration types used to initialize the
//! client for communication with an OData service.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ServiceConfig`]: The main configuration struct holding all client settings
//! - [`ServiceConfigBuilder`]: A builder for constructing [`ServiceConfig`] instances
//! - [`ServiceRootUrl`]: A validated service root URL newtype
//! - [`Credentials`]: The credential policy applied by the transport
//!
//! # Example
//!
//! ```rust
//! use odata_client::{ServiceConfig, ServiceRootUrl};
//!
//! let config = ServiceConfig::builder()
//!     .service_root(ServiceRootUrl::new("https://services.odata.org/V4/TripPinService").unwrap())
//!     .build()
//!     .unwrap();
//! ```

mod newtypes;

pub use newtypes::{Credentials, ServiceRootUrl};

use crate::error::ConfigError;

/// Configuration for the OData client.
///
/// Holds the service root, credential policy, and transport tuning used by
/// [`HttpClient`](crate::clients::HttpClient).
///
/// # Thread Safety
///
/// `ServiceConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
///
/// # Example
///
/// ```rust
/// use odata_client::{Credentials, ServiceConfig, ServiceRootUrl};
///
/// let config = ServiceConfig::builder()
///     .service_root(ServiceRootUrl::new("https://example.org/odata").unwrap())
///     .credentials(Credentials::bearer("token").unwrap())
///     .user_agent_prefix("MyApp/1.0")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.service_root().as_ref(), "https://example.org/odata");
/// ```
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    service_root: ServiceRootUrl,
    credentials: Credentials,
    user_agent_prefix: Option<String>,
    max_tries: u32,
}

impl ServiceConfig {
    /// Creates a new builder for constructing a `ServiceConfig`.
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Returns the service root URL.
    #[must_use]
    pub const fn service_root(&self) -> &ServiceRootUrl {
        &self.service_root
    }

    /// Returns the configured credential policy.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the optional User-Agent prefix.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the number of attempts the transport makes per request.
    ///
    /// A value of 1 disables retries. Retries apply only to 429 and 503
    /// responses; the resource layer never retries on its own.
    #[must_use]
    pub const fn max_tries(&self) -> u32 {
        self.max_tries
    }
}

/// Builder for [`ServiceConfig`] instances.
///
/// # Example
///
/// ```rust
/// use odata_client::{ServiceConfig, ServiceRootUrl};
///
/// let config = ServiceConfig::builder()
///     .service_root(ServiceRootUrl::new("https://example.org/odata").unwrap())
///     .max_tries(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    service_root: Option<ServiceRootUrl>,
    credentials: Credentials,
    user_agent_prefix: Option<String>,
    max_tries: Option<u32>,
}

impl ServiceConfigBuilder {
    /// Sets the service root URL (required).
    #[must_use]
    pub fn service_root(mut self, service_root: ServiceRootUrl) -> Self {
        self.service_root = Some(service_root);
        self
    }

    /// Sets the credential policy. Defaults to [`Credentials::Anonymous`].
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets a prefix prepended to the User-Agent header.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the number of attempts per request (default: 1, no retries).
    #[must_use]
    pub const fn max_tries(mut self, tries: u32) -> Self {
        self.max_tries = Some(tries);
        self
    }

    /// Builds the [`ServiceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `service_root` was
    /// never set.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let service_root = self.service_root.ok_or(ConfigError::MissingRequiredField {
            field: "service_root",
        })?;

        Ok(ServiceConfig {
            service_root,
            credentials: self.credentials,
            user_agent_prefix: self.user_agent_prefix,
            max_tries: self.max_tries.unwrap_or(1).max(1),
        })
    }
}

// Verify types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ServiceConfig>();
};
