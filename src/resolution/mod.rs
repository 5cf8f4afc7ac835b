/// Aggregate error reports and their resolution state
pub mod error_reports;

pub use error_reports::{ErrorReport, ErrorReportBook, ErrorReportStatus};
