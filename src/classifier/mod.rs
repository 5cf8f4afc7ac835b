/// Severity and category classification for audit and error events
pub mod audit_classifier;
pub mod error_classifier;

pub use audit_classifier::classify_audit;
pub use error_classifier::{classify, CapturedError, Classification, ContextType, ErrorContext};
