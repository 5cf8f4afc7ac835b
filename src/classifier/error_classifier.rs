//! Severity and category assignment for captured errors
//!
//! Classification only looks at its arguments, so the same error and context
//! always produce the same result.

use crate::events::{Category, Details, Severity};
use serde::{Deserialize, Serialize};

/// Message fragments that indicate an authentication or authorization failure
const AUTH_FAILURE_PHRASES: &[&str] = &[
    "unauthorized",
    "forbidden",
    "authentication failed",
    "permission denied",
    "access denied",
    "invalid token",
    "token expired",
];

/// Error class names raised by the runtime itself
const RUNTIME_ERROR_CLASSES: &[&str] = &["TypeError", "ReferenceError", "SyntaxError", "RangeError"];

/// Runtime error classes that always rank as high severity
const HIGH_SEVERITY_CLASSES: &[&str] = &["TypeError", "ReferenceError"];

/// A raw error as handed to the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedError {
    /// Error class name, e.g. `TypeError` or `NetworkError`
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl CapturedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture a Rust error, using its source chain as the stack
    pub fn from_error(name: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        let captured = Self::new(name, error.to_string());
        if chain.is_empty() {
            captured
        } else {
            captured.with_stack(chain.join("\ncaused by: "))
        }
    }
}

/// Explicit tag a caller puts on an error context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContextType {
    NetworkError,
    ValidationError,
    #[serde(untagged)]
    Other(String),
}

/// Caller-side context accompanying a captured error
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorContext {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub context_type: Option<ContextType>,
    /// HTTP status for network errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Present when the error was caught at a render boundary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Page or endpoint the error happened on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub extra: Details,
}

impl ErrorContext {
    pub fn network(status: u16) -> Self {
        Self {
            context_type: Some(ContextType::NetworkError),
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn validation() -> Self {
        Self {
            context_type: Some(ContextType::ValidationError),
            ..Self::default()
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Result of classifying an event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    pub category: Category,
}

/// Classify a captured error
pub fn classify(error: &CapturedError, context: &ErrorContext) -> Classification {
    Classification {
        severity: error_severity(error, context),
        category: error_category(error, context),
    }
}

fn error_severity(error: &CapturedError, context: &ErrorContext) -> Severity {
    let message = error.message.to_lowercase();

    if AUTH_FAILURE_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
    {
        return Severity::Critical;
    }

    match context.context_type {
        Some(ContextType::NetworkError) => {
            return match context.status.unwrap_or(0) {
                status if status >= 500 => Severity::High,
                status if status >= 400 => Severity::Medium,
                _ => Severity::Low,
            };
        }
        Some(ContextType::ValidationError) => return Severity::Low,
        _ => {}
    }

    if context.component_stack.is_some() {
        return Severity::High;
    }

    if HIGH_SEVERITY_CLASSES.contains(&error.name.as_str()) {
        return Severity::High;
    }

    Severity::Medium
}

fn error_category(error: &CapturedError, context: &ErrorContext) -> Category {
    match context.context_type {
        Some(ContextType::NetworkError) => return Category::Network,
        Some(ContextType::ValidationError) => return Category::Validation,
        _ => {}
    }

    let message = error.message.to_lowercase();
    if message.contains("auth") || message.contains("login") {
        return Category::Authentication;
    }
    if message.contains("database") || message.contains("sql") {
        return Category::Database;
    }

    if RUNTIME_ERROR_CLASSES.contains(&error.name.as_str()) {
        return Category::Runtime;
    }

    Category::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_is_critical_regardless_of_context() {
        let error = CapturedError::new("Error", "Request failed: Unauthorized");
        let result = classify(&error, &ErrorContext::network(200));

        assert_eq!(result.severity, Severity::Critical);
        // explicit context type still wins for the category
        assert_eq!(result.category, Category::Network);
    }

    #[test]
    fn test_network_errors_map_by_status() {
        let error = CapturedError::new("NetworkError", "Request failed");

        assert_eq!(
            classify(&error, &ErrorContext::network(503)).severity,
            Severity::High
        );
        assert_eq!(
            classify(&error, &ErrorContext::network(404)).severity,
            Severity::Medium
        );
        assert_eq!(
            classify(&error, &ErrorContext::network(302)).severity,
            Severity::Low
        );

        let no_status = ErrorContext {
            context_type: Some(ContextType::NetworkError),
            ..ErrorContext::default()
        };
        assert_eq!(classify(&error, &no_status).severity, Severity::Low);
    }

    #[test]
    fn test_validation_errors_are_low() {
        let error = CapturedError::new("ValidationError", "email: must not be empty");
        let result = classify(&error, &ErrorContext::validation());

        assert_eq!(result.severity, Severity::Low);
        assert_eq!(result.category, Category::Validation);
    }

    #[test]
    fn test_render_boundary_errors_are_high() {
        let error = CapturedError::new("Error", "Something broke while rendering");
        let context = ErrorContext {
            component_stack: Some("at RestaurantList".to_string()),
            ..ErrorContext::default()
        };

        let result = classify(&error, &context);
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.category, Category::Unknown);
    }

    #[test]
    fn test_runtime_error_classes() {
        let context = ErrorContext::default();

        let type_error = CapturedError::new("TypeError", "x is undefined");
        assert_eq!(
            classify(&type_error, &context),
            Classification {
                severity: Severity::High,
                category: Category::Runtime,
            }
        );

        let range_error = CapturedError::new("RangeError", "index out of range");
        assert_eq!(
            classify(&range_error, &context),
            Classification {
                severity: Severity::Medium,
                category: Category::Runtime,
            }
        );
    }

    #[test]
    fn test_message_keyword_categories() {
        let context = ErrorContext::default();

        let login = CapturedError::new("Error", "Login session could not be refreshed");
        assert_eq!(classify(&login, &context).category, Category::Authentication);

        let sql = CapturedError::new("TypeError", "SQL statement rejected");
        let result = classify(&sql, &context);
        assert_eq!(result.category, Category::Database);
        assert_eq!(result.severity, Severity::High);
    }

    #[test]
    fn test_default_classification() {
        let error = CapturedError::new("Error", "Something odd happened");
        assert_eq!(
            classify(&error, &ErrorContext::default()),
            Classification {
                severity: Severity::Medium,
                category: Category::Unknown,
            }
        );
    }

    #[test]
    fn test_context_type_deserialization() {
        let context: ErrorContext =
            serde_json::from_str(r#"{"type": "network-error", "status": 500}"#).unwrap();
        assert_eq!(context.context_type, Some(ContextType::NetworkError));

        let other: ErrorContext = serde_json::from_str(r#"{"type": "chunk-load"}"#).unwrap();
        assert_eq!(
            other.context_type,
            Some(ContextType::Other("chunk-load".to_string()))
        );
    }

    #[test]
    fn test_from_error_collects_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk unplugged");
        let captured = CapturedError::from_error("IoError", &io);

        assert_eq!(captured.name, "IoError");
        assert_eq!(captured.message, "disk unplugged");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn prop_classification_is_pure(
        name: String,
        message: String,
        status: Option<u16>,
        boundary: bool,
    ) -> bool {
        let error = CapturedError::new(name, message);
        let context = ErrorContext {
            context_type: status.map(|_| ContextType::NetworkError),
            status,
            component_stack: boundary.then(|| "at App".to_string()),
            ..ErrorContext::default()
        };

        classify(&error, &context) == classify(&error.clone(), &context.clone())
    }
}
