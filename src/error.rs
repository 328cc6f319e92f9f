//! Error types for the Sonarr provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Summary used for every upstream client failure.
pub const CLIENT_ERROR_SUMMARY: &str = "Client Error";

/// Errors that can occur while reconciling against the upstream service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure or an upstream response that cannot be tolerated.
    #[error("Client Error: {method} {path}: {message}")]
    ClientError {
        /// HTTP method of the failed request.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Upstream or transport message.
        message: String,
    },

    /// The upstream rejected the API key.
    #[error("Client Error: {method} {path}: unauthorized")]
    AuthFailure {
        /// HTTP method of the failed request.
        method: String,
        /// Request path relative to the base URL.
        path: String,
    },

    /// A lookup found no matching entity.
    #[error("Unable to find {0}")]
    NotFound(String),

    /// A lookup or import key matched more than one entity.
    #[error("Ambiguous {kind}: candidates {}", .candidates.join(", "))]
    Ambiguous {
        /// Entity kind being looked up.
        kind: String,
        /// Identifiers of every match.
        candidates: Vec<String>,
    },

    /// An adapter pre-write check failed.
    #[error("Validation error at {attribute}: {message}")]
    Validation {
        /// Attribute path the error is pinned to.
        attribute: String,
        /// What is wrong with the value.
        message: String,
    },

    /// An unknown value reached the write path.
    #[error("Unknown value at {0} cannot be sent upstream")]
    EncodeUnknown(String),

    /// An upstream value does not match the declared attribute type.
    #[error("Type mismatch at {path}: expected {expected}, got {got}")]
    DecodeTypeMismatch {
        /// Attribute path being decoded.
        path: String,
        /// Declared type.
        expected: String,
        /// JSON type received.
        got: String,
    },

    /// An upstream number does not fit the declared attribute type.
    #[error("Value at {path} overflows: {value}")]
    DecodeOverflow {
        /// Attribute path being decoded.
        path: String,
        /// The offending number.
        value: String,
    },

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The operation was cancelled before the upstream answered.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Build a client error for a request.
    pub fn client(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ClientError {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a validation error pinned to an attribute.
    pub fn validation(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::ClientError { message, .. } => message.clone(),
            Self::AuthFailure { .. } => "unauthorized".to_string(),
            Self::NotFound(kind) => format!("Unable to find {}", kind),
            Self::Ambiguous { candidates, .. } => candidates.join(", "),
            Self::Validation { message, .. } => message.clone(),
            Self::EncodeUnknown(path) => path.clone(),
            Self::DecodeTypeMismatch { expected, got, .. } => {
                format!("expected {}, got {}", expected, got)
            },
            Self::DecodeOverflow { value, .. } => value.clone(),
            Self::Configuration(msg) => msg.clone(),
            Self::UnknownResource(msg) => msg.clone(),
            Self::Unimplemented(msg) => msg.clone(),
            Self::Cancelled(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
        }
    }

    /// Whether this is an upstream client failure (including auth failures).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientError { .. } | Self::AuthFailure { .. })
    }

    /// Convert the error into the diagnostic shown to the operator.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::ClientError {
                method,
                path,
                message,
            } => Diagnostic::error(CLIENT_ERROR_SUMMARY)
                .with_detail(format!("{} {}: {}", method, path, message)),
            Self::AuthFailure { method, path } => Diagnostic::error(CLIENT_ERROR_SUMMARY)
                .with_detail(format!(
                    "{} {}: unauthorized; check that api_key matches the Sonarr API key",
                    method, path
                ))
                .with_attribute("api_key"),
            Self::NotFound(kind) => Diagnostic::error(format!("Unable to find {}", kind)),
            Self::Ambiguous { kind, candidates } => {
                Diagnostic::error(format!("Multiple {} entries match", kind))
                    .with_detail(format!("Candidates: {}", candidates.join(", ")))
            },
            Self::Validation { attribute, message } => {
                Diagnostic::error(format!("Invalid attribute '{}'", attribute))
                    .with_detail(message.clone())
                    .with_attribute(attribute.clone())
            },
            Self::EncodeUnknown(path) => Diagnostic::error("Unknown value on write path")
                .with_detail(self.to_string())
                .with_attribute(path.clone()),
            Self::DecodeTypeMismatch { path, .. } | Self::DecodeOverflow { path, .. } => {
                Diagnostic::error("Unexpected upstream value")
                    .with_detail(self.to_string())
                    .with_attribute(path.clone())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("tag".to_string());
        assert_eq!(format!("{}", err), "Unable to find tag");

        let err = ProviderError::client("GET", "/api/v3/tag", "connection refused");
        assert_eq!(
            format!("{}", err),
            "Client Error: GET /api/v3/tag: connection refused"
        );

        let err = ProviderError::Ambiguous {
            kind: "series".to_string(),
            candidates: vec!["1".to_string(), "4".to_string()],
        };
        assert_eq!(format!("{}", err), "Ambiguous series: candidates 1, 4");
    }

    #[test]
    fn test_client_error_diagnostic() {
        let diag = ProviderError::client("PUT", "/api/v3/tag/3", "boom").to_diagnostic();
        assert_eq!(diag.summary, "Client Error");
        assert_eq!(diag.detail.as_deref(), Some("PUT /api/v3/tag/3: boom"));

        let diag = ProviderError::AuthFailure {
            method: "GET".to_string(),
            path: "/api/v3/tag".to_string(),
        }
        .to_diagnostic();
        assert_eq!(diag.summary, "Client Error");
        assert!(diag.detail.unwrap().contains("api_key"));
    }

    #[test]
    fn test_validation_diagnostic_is_pinned() {
        let diag = ProviderError::validation("cutoff", "must match a quality group").to_diagnostic();
        assert_eq!(diag.attribute.as_deref(), Some("cutoff"));
        assert_eq!(diag.detail.as_deref(), Some("must match a quality group"));
    }

    #[test]
    fn test_lookup_diagnostic() {
        let diag = ProviderError::NotFound("quality profile".to_string()).to_diagnostic();
        assert_eq!(diag.summary, "Unable to find quality profile");
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("missing url".to_string());
        assert_eq!(err.message(), "missing url");
        assert!(!err.is_client_error());

        let err = ProviderError::DecodeTypeMismatch {
            path: "label".to_string(),
            expected: "string".to_string(),
            got: "number".to_string(),
        };
        assert_eq!(err.message(), "expected string, got number");
    }
}
