//! JSON and CSV export of event slices

use crate::error::ExportError;
use crate::events::Event;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column order of CSV exports
pub const CSV_COLUMNS: [&str; 7] = [
    "id",
    "timestamp",
    "actor",
    "action",
    "resource",
    "severity",
    "category",
];

/// Supported export encodings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Encode events in the given format, preserving their order
pub fn export_events(events: &[Event], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(events)?),
        ExportFormat::Csv => Ok(to_csv(events)),
    }
}

fn to_csv(events: &[Event]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');

    for event in events {
        let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let fields = [
            event.id.to_string(),
            timestamp,
            event.actor.clone().unwrap_or_default(),
            event.action.clone(),
            event.resource.clone(),
            event.severity.to_string(),
            event.category.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|field| quote_field(field)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Wrap a field in double quotes, doubling any embedded quote
fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Category, EventDraft, EventKind, Severity};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn event(action: &str, actor: Option<&str>, severity: Severity, offset_secs: i64) -> Event {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        EventDraft::new(
            EventKind::Audit,
            action,
            "restaurant",
            severity,
            Category::DataModification,
        )
        .with_actor(actor.map(str::to_string))
        .into_event(Uuid::new_v4(), base + Duration::seconds(offset_secs))
    }

    /// Minimal reader for the quoting scheme `to_csv` produces
    fn parse_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                ('"', _) => in_quotes = !in_quotes,
                (',', false) => fields.push(std::mem::take(&mut current)),
                (c, _) => current.push(c),
            }
        }
        fields.push(current);
        fields
    }

    #[test]
    fn test_csv_parses_back_in_order() {
        let events = vec![
            event("delete", Some("alice"), Severity::Critical, 10),
            event("update", Some("bob"), Severity::Medium, 0),
        ];

        let csv = export_events(&events, ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,timestamp,actor,action,resource,severity,category"
        );

        for expected in &events {
            let fields = parse_csv_line(lines.next().unwrap());
            assert_eq!(fields.len(), CSV_COLUMNS.len());
            assert_eq!(fields[0], expected.id.to_string());
            assert_eq!(fields[3], expected.action);
            assert_eq!(fields[5], expected.severity.as_str());
        }
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_escapes_quotes_and_commas() {
        let events = vec![event("rename \"main\", branch", None, Severity::Low, 0)];

        let csv = export_events(&events, ExportFormat::Csv).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("\"rename \"\"main\"\", branch\""));

        let fields = parse_csv_line(row);
        assert_eq!(fields[2], "");
        assert_eq!(fields[3], "rename \"main\", branch");
    }

    #[test]
    fn test_csv_timestamps_are_rfc3339() {
        let events = vec![event("create", Some("alice"), Severity::Medium, 0)];

        let csv = export_events(&events, ExportFormat::Csv).unwrap();
        let fields = parse_csv_line(csv.lines().nth(1).unwrap());
        assert_eq!(fields[1], "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_json_export_is_pretty_and_round_trips() {
        let events = vec![event("login", Some("alice"), Severity::Medium, 0)];

        let json = export_events(&events, ExportFormat::Json).unwrap();
        assert!(json.starts_with("[\n  {"));

        let decoded: Vec<Event> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, events);
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(export_events(&[], ExportFormat::Json).unwrap(), "[]");
        assert_eq!(
            export_events(&[], ExportFormat::Csv).unwrap(),
            "id,timestamp,actor,action,resource,severity,category\n"
        );
    }
}
