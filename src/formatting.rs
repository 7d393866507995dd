//! Terminal rendering of watchlist entries and live checks.

use crate::core::{ExpiryStatus, WatchEntry};
use serde::Serialize;

/// Renders watchlist data for the terminal.
pub trait WatchlistFormatter: Send + Sync {
    fn format_entries(&self, entries: &[WatchEntry]) -> String;
    fn format_status(&self, status: &ExpiryStatus) -> String;
}

/// Picks the formatter for the `--json` flag.
pub fn formatter(json: bool) -> Box<dyn WatchlistFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}

/// Aligned plain-text columns.
pub struct TableFormatter;

const HEADERS: [&str; 3] = ["HOST", "EXPIRY", "DAYS"];

impl TableFormatter {
    fn render(rows: &[[String; 3]]) -> String {
        let mut widths = HEADERS.map(str::len);
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let line = |cells: [&str; 3]| {
            format!(
                "{:<w0$}  {:<w1$}  {:>w2$}",
                cells[0],
                cells[1],
                cells[2],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2]
            )
            .trim_end()
            .to_string()
        };

        let mut lines = vec![line(HEADERS)];
        lines.extend(rows.iter().map(|row| line([row[0].as_str(), row[1].as_str(), row[2].as_str()])));
        lines.join("\n")
    }
}

impl WatchlistFormatter for TableFormatter {
    fn format_entries(&self, entries: &[WatchEntry]) -> String {
        if entries.is_empty() {
            return "Watchlist is empty.".to_string();
        }
        let rows: Vec<[String; 3]> = entries
            .iter()
            .map(|entry| {
                [
                    entry.host.clone(),
                    entry
                        .expiry
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    entry
                        .days_until_expiry
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        Self::render(&rows)
    }

    fn format_status(&self, status: &ExpiryStatus) -> String {
        Self::render(&[[
            status.host.clone(),
            status.expiry.to_string(),
            status.days_until_expiry.to_string(),
        ]])
    }
}

/// One JSON object per entry, with snake_case keys.
pub struct JsonFormatter;

#[derive(Serialize)]
struct EntryView<'a> {
    host: &'a str,
    expiry: Option<String>,
    days_until_expiry: Option<i64>,
}

impl JsonFormatter {
    fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {e}\"}}"))
    }
}

impl WatchlistFormatter for JsonFormatter {
    fn format_entries(&self, entries: &[WatchEntry]) -> String {
        let views: Vec<EntryView<'_>> = entries
            .iter()
            .map(|entry| EntryView {
                host: &entry.host,
                expiry: entry.expiry.map(|e| e.to_string()),
                days_until_expiry: entry.days_until_expiry,
            })
            .collect();
        Self::to_json(&views)
    }

    fn format_status(&self, status: &ExpiryStatus) -> String {
        Self::to_json(status)
    }
}
