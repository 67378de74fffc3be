//! Framework error type and HTTP status mapping.
//!
//! Every pipeline stage reports failures through [`DaedalusError`];
//! the application layer maps the error onto an HTTP response via
//! [`DaedalusError::status_code`] and [`DaedalusError::to_envelope`].

use http::StatusCode;
use serde::{Deserialize, Serialize};

use daedalus_reflect::ReflectError;

/// Broad classification of a framework error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Misconfigured module definition, missing handler, bad wiring.
    Configuration,
    /// Request payload failed conversion or validation.
    Validation,
    /// The request carries no usable identity.
    Authentication,
    /// The identity is known but not permitted.
    Authorization,
    /// No route or entity matched.
    NotFound,
    /// Unexpected internal failure.
    Internal,
}

impl ErrorCategory {
    /// Default HTTP status for the category.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// A single conversion or validation problem, addressed by the path of
/// the offending value inside the bound parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path segments from the parameter root, e.g. `["owner", "id"]`.
    pub path: Vec<String>,
    /// Human-readable problem descriptions.
    pub messages: Vec<String>,
}

impl ValidationIssue {
    /// Creates an issue at the given path.
    #[must_use]
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            messages: vec![message.into()],
        }
    }

    /// Dotted rendering of the path, empty for the root.
    #[must_use]
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Unified error for the whole request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DaedalusError {
    /// Module definition or wiring problem, surfaced at startup or as
    /// a 500 when hit during a request.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is misconfigured.
        message: String,
    },

    /// Parameter conversion or validation failure, aggregated across
    /// all parameters of the action.
    #[error("validation failed with {} issue(s)", issues.len())]
    Validation {
        /// All collected issues.
        issues: Vec<ValidationIssue>,
    },

    /// No usable identity on the request.
    #[error("authentication required: {message}")]
    Authentication {
        /// Why the request is unauthenticated.
        message: String,
    },

    /// Identity present but denied.
    #[error("access denied: {message}")]
    Authorization {
        /// Why access was denied.
        message: String,
        /// Paths of the values that failed entity-level checks, empty
        /// for route-level denials.
        paths: Vec<String>,
    },

    /// No matching route or entity.
    #[error("not found: {message}")]
    NotFound {
        /// What was not found.
        message: String,
    },

    /// An error that carries its own HTTP status.
    #[error("{message}")]
    HttpStatus {
        /// Status to respond with.
        status: StatusCode,
        /// Response message.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal {
        /// Summary of the failure.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DaedalusError {
    /// Shorthand for a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Shorthand for a route-level authorization error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            paths: Vec::new(),
        }
    }

    /// Shorthand for a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for an internal error without a cause.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// The broad category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::HttpStatus { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HttpStatus { status, .. } => *status,
            other => other.category().status_code(),
        }
    }

    /// Serializable response body for this error.
    #[must_use]
    pub fn to_envelope(&self) -> serde_json::Value {
        let mut error = serde_json::json!({
            "category": self.category(),
            "message": self.to_string(),
        });
        match self {
            Self::Validation { issues } => {
                error["issues"] = serde_json::to_value(issues)
                    .unwrap_or(serde_json::Value::Null);
            }
            Self::Authorization { paths, .. } if !paths.is_empty() => {
                error["paths"] = serde_json::json!(paths);
            }
            _ => {}
        }
        serde_json::json!({ "error": error })
    }
}

impl From<ReflectError> for DaedalusError {
    fn from(err: ReflectError) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

/// Convenience alias used across the pipeline.
pub type DaedalusResult<T> = Result<T, DaedalusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_mapping() {
        assert_eq!(
            DaedalusError::authentication("no identity").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DaedalusError::forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DaedalusError::not_found("no such route").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DaedalusError::Validation { issues: vec![] }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            DaedalusError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_http_status_overrides_category() {
        let err = DaedalusError::HttpStatus {
            status: StatusCode::CONFLICT,
            message: "already exists".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_envelope_carries_issues() {
        let err = DaedalusError::Validation {
            issues: vec![ValidationIssue::new(
                vec!["owner".to_string(), "id".to_string()],
                "Unable to convert \"abc\" to number",
            )],
        };
        let envelope = err.to_envelope();
        let issues = &envelope["error"]["issues"];
        assert_eq!(issues[0]["path"][0], "owner");
        assert_eq!(issues[0]["messages"][0], "Unable to convert \"abc\" to number");
    }

    #[test]
    fn test_reflect_error_is_configuration() {
        let err: DaedalusError =
            ReflectError::DuplicateName("Animal".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
