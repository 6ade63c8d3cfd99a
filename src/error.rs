//! Error types for client configuration.
//!
//! This module contains error types used for configuration and validation
//! errors raised before any request is issued.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use odata_client::{ConfigError, ServiceRootUrl};
//!
//! let result = ServiceRootUrl::new("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidServiceRoot { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur during client configuration.
///
/// Each variant provides a clear, actionable error message. Configuration
/// errors are always raised synchronously, before any I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Service root URL is invalid.
    #[error("Invalid service root URL '{url}'. Please provide an absolute URL with scheme (e.g., 'https://services.odata.org/V4/TripPinService').")]
    InvalidServiceRoot {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A credential value is empty.
    #[error("Credential value for '{field}' cannot be empty.")]
    EmptyCredential {
        /// The name of the empty credential field.
        field: &'static str,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },
}
