//! Audit and error event pipeline
//!
//! Records audit activity and captured application errors into an in-memory
//! store, classifies them, fires threshold alert rules over sliding windows,
//! forwards critical activity to an external audit endpoint, and builds
//! reports, exports and resolution state on demand.
//!
//! ```no_run
//! use ledgerwatch::config::Config;
//! use ledgerwatch::pipeline::{AuditEntry, Pipeline};
//! use ledgerwatch::store::EventFilter;
//!
//! let mut pipeline = Pipeline::from_config(&Config::default()).unwrap();
//! pipeline.log_event(AuditEntry::new("delete", "restaurant").with_actor("alice"));
//!
//! let report = pipeline.generate_report("Deletes", "", EventFilter::all(), "admin");
//! println!("{}", report.render_text());
//! ```

/// Error types for the pipeline
pub mod error;

/// Event records shared by every component
pub mod events;

/// Time sources
pub mod clock;

/// Severity and category classification
pub mod classifier;

/// Append-only event store
pub mod store;

/// Threshold alert rules and their evaluation
pub mod rules;

/// Notification gating and delivery surfaces
pub mod alerts;

/// Outbound HTTP delivery with retries
pub mod delivery;

/// Reports, exports and statistics
pub mod reports;

/// Aggregate error reports and resolution state
pub mod resolution;

/// Configuration management
pub mod config;

/// The pipeline context tying the components together
pub mod pipeline;

/// JSON-lines replay input
pub mod ingest;

// Re-export commonly used types
pub use error::{ConfigError, DeliveryError, ExportError, NotificationError, RuleError};
pub use events::{Category, Event, EventId, EventKind, Severity};
pub use pipeline::{AuditEntry, Pipeline, PipelineBuilder};
