//! JSON-lines input for replaying recorded activity through a pipeline
//!
//! Each line is one object tagged with `type`:
//!
//! ```text
//! {"type":"audit","actor":"alice","action":"delete","resource":"restaurant"}
//! {"type":"error","error":{"name":"TypeError","message":"x is undefined"},"context":{"url":"/orders"}}
//! {"type":"resolve","id":"<event id>","resolution":"fixed","resolved_by":"alice"}
//! ```

use crate::classifier::{CapturedError, ErrorContext};
use crate::events::EventId;
use crate::pipeline::{AuditEntry, Pipeline};
use crate::store::ResolveOutcome;
use serde::{Deserialize, Serialize};

/// One line of replay input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputRecord {
    Audit(AuditEntry),
    Error {
        error: CapturedError,
        #[serde(default)]
        context: ErrorContext,
    },
    Resolve {
        id: EventId,
        resolution: String,
        resolved_by: String,
    },
}

/// What applying a record did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// An event was recorded under this id
    Recorded(EventId),
    /// Recording is disabled
    Skipped,
    Resolved(ResolveOutcome),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Option<Result<InputRecord, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Feed a parsed record into the pipeline
pub fn apply(pipeline: &mut Pipeline, record: InputRecord) -> Applied {
    let recorded = match record {
        InputRecord::Audit(entry) => pipeline.log_event(entry),
        InputRecord::Error { error, context } => pipeline.capture_error(error, context),
        InputRecord::Resolve {
            id,
            resolution,
            resolved_by,
        } => return Applied::Resolved(pipeline.resolve_error(&id, &resolution, &resolved_by)),
    };

    match recorded {
        Some(id) => Applied::Recorded(id),
        None => Applied::Skipped,
    }
}
