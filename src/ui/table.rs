//! Table output for `list` and `versions`

use crate::types::{FileRecord, VersionRecord};
use chrono::{DateTime, Utc};
use indicatif::HumanBytes;

const COLUMN_GAP: &str = "     ";

/// Render stored files as FILENAME / SIZE / UPDATED
pub fn files_table(files: &[FileRecord], now: DateTime<Utc>) -> String {
    let rows = files
        .iter()
        .map(|file| {
            vec![
                file.filename.clone(),
                HumanBytes(file.size).to_string(),
                format!("{} ago", time_ago(file.updated_at, now)),
            ]
        })
        .collect::<Vec<_>>();
    render(&["FILENAME", "SIZE", "UPDATED"], &rows)
}

/// Render stored versions as VERSION / SIZE / UPDATED
pub fn versions_table(versions: &[VersionRecord], now: DateTime<Utc>) -> String {
    let rows = versions
        .iter()
        .map(|version| {
            vec![
                version
                    .version
                    .clone()
                    .unwrap_or_else(|| "<none>".to_string()),
                HumanBytes(version.size).to_string(),
                format!("{} ago", time_ago(version.updated_at, now)),
            ]
        })
        .collect::<Vec<_>>();
    render(&["VERSION", "SIZE", "UPDATED"], &rows)
}

fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    let format_row = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        format!("{}\n", padded.join(COLUMN_GAP).trim_end())
    };

    let mut output = format_row(headers.to_vec());
    for row in rows {
        output.push_str(&format_row(row.iter().map(String::as_str).collect()));
    }
    output
}

/// Coarse elapsed time: seconds, minutes, hours or days
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        pluralize(seconds, "second")
    } else if seconds < 60 * 60 {
        pluralize(seconds / 60, "minute")
    } else if seconds < 60 * 60 * 24 {
        pluralize(seconds / (60 * 60), "hour")
    } else {
        pluralize(seconds / (60 * 60 * 24), "day")
    }
}

fn pluralize(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
