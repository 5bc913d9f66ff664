//! Error types for the Stratosphere provisioning client.
//!
//! Errors are grouped by concern: schema validation, client configuration,
//! the remote provisioning API and the reconciliation workflow. Validation
//! errors always carry the kind and the attribute path that failed.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Stratosphere.
#[derive(Debug, Error)]
pub enum StratosphereError {
    /// Schema validation errors.
    #[error("Validation error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote provisioning API errors.
    #[error("Deployment Manager API error: {0}")]
    Remote(#[from] RemoteError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while validating a resource or property tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The attribute is not declared by the schema.
    #[error("{kind} does not support attribute '{path}'")]
    UnknownAttribute {
        /// Kind that rejected the attribute.
        kind: String,
        /// Path of the offending attribute.
        path: String,
    },

    /// The value has the wrong type.
    #[error("{kind}: {path} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Kind declaring the attribute.
        kind: String,
        /// Path of the offending attribute.
        path: String,
        /// Declared type.
        expected: String,
        /// Type of the supplied value.
        actual: String,
    },

    /// The value is of the right type but not allowed.
    #[error("{kind}: {path} is {value}, expected {constraint}")]
    ConstraintViolation {
        /// Kind declaring the attribute.
        kind: String,
        /// Path of the offending attribute.
        path: String,
        /// Rendered offending value.
        value: String,
        /// Description of the allowed values or predicate.
        constraint: String,
    },

    /// A required attribute was never set.
    #[error("{kind}: required attribute '{path}' is missing")]
    MissingRequiredAttribute {
        /// Kind declaring the attribute.
        kind: String,
        /// Path of the missing attribute.
        path: String,
    },

    /// A cross-field rule failed.
    #[error("{kind} '{path}': {message}")]
    SemanticViolation {
        /// Kind whose rule failed.
        kind: String,
        /// Path of the instance.
        path: String,
        /// Human-readable explanation.
        message: String,
    },

    /// Two resources in the same template share a name.
    #[error("Duplicate resource name in template: {name}")]
    DuplicateResource {
        /// The duplicated name.
        name: String,
    },

    /// A property schema was used where a resource schema is required.
    #[error("{kind} is a property kind and cannot be used as a top-level resource")]
    NotAResource {
        /// The property kind.
        kind: String,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file was not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A file could not be parsed.
    #[error("Failed to parse {}: {message}", .location.as_deref().unwrap_or("input"))]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation of the client settings failed.
    #[error("Settings validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A required setting was not supplied by flag, environment or file.
    #[error("Missing setting '{name}': pass --{name} or set {env}")]
    MissingSetting {
        /// Setting name (also the CLI flag).
        name: String,
        /// Environment variable that can supply it.
        env: String,
    },

    /// A catalog file names a resource kind the registry does not know.
    #[error("Unknown resource kind '{kind}' in {location}")]
    UnknownResourceKind {
        /// The unknown kind.
        kind: String,
        /// Where it was referenced.
        location: String,
    },
}

/// Remote provisioning API errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The requested object does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// Path or name of the missing object.
        resource: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The operation finished with embedded errors.
    #[error("Operation {operation} failed:\n{}", format_errors(.errors))]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Every embedded error, in the order reported.
        errors: Vec<String>,
    },

    /// The poll deadline passed before the operation finished.
    #[error("Timed out after {waited_secs}s waiting for operation {operation}")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Seconds spent polling.
        waited_secs: u64,
    },

    /// The deployment record does not point at any manifest.
    #[error("Deployment {deployment} has no manifest to compare against")]
    MissingManifest {
        /// Deployment name.
        deployment: String,
    },
}

fn format_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for Stratosphere operations.
pub type Result<T> = std::result::Result<T, StratosphereError>;

impl StratosphereError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Remote(RemoteError::RateLimited { .. } | RemoteError::NetworkError { .. })
        )
    }

    /// Returns the server-suggested retry delay in seconds, if any.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Remote(RemoteError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns true if this is a remote "not found" error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote(RemoteError::NotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error tied to a location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

impl RemoteError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_lists_every_error() {
        let err = ReconcileError::OperationFailed {
            operation: String::from("operation-123"),
            errors: vec![String::from("QUOTA_EXCEEDED"), String::from("RESOURCE_ERROR")],
        };
        let text = err.to_string();
        assert!(text.contains("operation-123"));
        assert!(text.contains("  - QUOTA_EXCEEDED"));
        assert!(text.contains("  - RESOURCE_ERROR"));
    }

    #[test]
    fn test_retryable_errors() {
        let rate_limited = StratosphereError::Remote(RemoteError::RateLimited {
            retry_after_secs: 7,
        });
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_delay_secs(), Some(7));

        let not_found = StratosphereError::Remote(RemoteError::NotFound {
            resource: String::from("dev-networks"),
        });
        assert!(!not_found.is_retryable());
        assert!(not_found.is_not_found());

        let network = RemoteError::network("connection reset");
        assert!(StratosphereError::from(network).retry_delay_secs().is_none());
    }
}
