use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Input rejected before any remote call (bad address, missing or mistyped field).
    Validation(String),
    /// Template key not present in the registry.
    UnknownTemplate(String),
    /// Tag is not a recognized custom field.
    InvalidTag(String),
    /// The remote API answered with a non-success status.
    RemoteApi {
        /// HTTP status returned by the remote API.
        status: u16,
        /// Merged error messages from the response body.
        message: String,
    },
    /// The remote API kept rate-limiting after all retries.
    RateLimited(String),
    /// A created resource never became visible.
    CreationFailed {
        /// Kind of resource ("list", "custom field", ...).
        resource: String,
        /// Name that was created.
        name: String,
    },
    /// A post-write read did not reflect the expected state.
    Verification(String),
    /// The remote API matched more records than it returned.
    IncompleteResult {
        /// Records the remote API reported as matching.
        expected: u64,
        /// Records actually returned.
        received: usize,
    },
    /// Missing or invalid configuration.
    Config(String),
    /// Internal error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns true when the error (or its source, through any context) is a remote 429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AppError::RateLimited(_) => true,
            AppError::RemoteApi { status, .. } => *status == 429,
            AppError::WithContext { source, .. } => source.is_rate_limited(),
            _ => false,
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::UnknownTemplate(key) => write!(f, "Unknown template key: {}", key),
            AppError::InvalidTag(tag) => write!(f, "Invalid tag: {}", tag),
            AppError::RemoteApi { status, message } => {
                write!(f, "Remote API error ({}): {}", status, message)
            }
            AppError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            AppError::CreationFailed { resource, name } => {
                write!(f, "Failed to create {} '{}'", resource, name)
            }
            AppError::Verification(msg) => write!(f, "Verification failed: {}", msg),
            AppError::IncompleteResult { expected, received } => write!(
                f,
                "Incomplete result: {} records matched but only {} were returned",
                expected, received
            ),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(_) | AppError::UnknownTemplate(_) | AppError::InvalidTag(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::RemoteApi { status, message } => {
                tracing::error!("Remote API error {}: {}", status, message);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::RateLimited(msg) => {
                tracing::warn!("Remote API rate limit exhausted: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            AppError::CreationFailed { .. }
            | AppError::Verification(_)
            | AppError::IncompleteResult { .. } => {
                tracing::error!("Consistency error: {}", self);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Config(msg) | AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detected_through_context() {
        let err: Result<(), AppError> = Err(AppError::RemoteApi {
            status: 429,
            message: "too many requests".to_string(),
        });
        let wrapped = err.context("Creating list").unwrap_err();

        assert!(wrapped.is_rate_limited());
        assert!(matches!(wrapped.root(), AppError::RemoteApi { status: 429, .. }));
    }

    #[test]
    fn test_other_statuses_are_not_rate_limits() {
        let err = AppError::RemoteApi {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_rate_limited());
        assert!(!AppError::Validation("bad".to_string()).is_rate_limited());
    }

    #[test]
    fn test_invalid_tag_display() {
        let err = AppError::InvalidTag("vip".to_string());
        assert!(err.to_string().starts_with("Invalid tag"));
    }

    #[test]
    fn test_context_display_chain() {
        let err: Result<(), AppError> = Err(AppError::Verification("field mismatch".to_string()));
        let wrapped = err.with_context(|| "Subscribing a@b.co".to_string()).unwrap_err();
        assert_eq!(
            wrapped.to_string(),
            "Subscribing a@b.co: Verification failed: field mismatch"
        );
    }
}
