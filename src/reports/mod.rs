/// Report snapshots, exports and headline statistics
pub mod export;
pub mod report;
pub mod stats;

pub use export::{export_events, ExportFormat, CSV_COLUMNS};
pub use report::{Report, ReportSummary, ANONYMOUS_ACTOR};
pub use stats::{AuditStats, ErrorStats};
