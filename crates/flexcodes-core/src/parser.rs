//! CSV parsing for the gate-code dataset.
//!
//! The dataset is a small hand-maintained file, so the parser is lenient:
//! it never fails, matches header names case-insensitively in any order,
//! and drops rows that have no address.

use tracing::debug;

use crate::models::{AccessCodeRecord, DEFAULT_COMMUNITY, DEFAULT_TYPE};

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Columns {
    community: Option<usize>,
    address: Option<usize>,
    gate: Option<usize>,
    kind: Option<usize>,
}

impl Columns {
    fn from_header(line: &str) -> Self {
        let names: Vec<String> = split_line(line)
            .into_iter()
            .map(|name| name.trim().to_lowercase())
            .collect();
        let position = |wanted: &str| names.iter().position(|name| name == wanted);

        Self {
            community: position("community"),
            address: position("address"),
            gate: position("gate"),
            kind: position("type"),
        }
    }
}

/// Split one CSV line into fields.
///
/// A delimiter inside double quotes is not a field boundary, and `""` inside
/// a quoted segment is one literal quote. Unbalanced quotes never fail: the
/// rest of the line simply stays in the current field.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
}

/// Parse dataset text into records, in file order.
///
/// Accepts `\n`, `\r\n` or bare `\r` line endings. Blank lines are skipped,
/// the first remaining line is the header. Empty `community` becomes
/// "Unspecified", empty `type` becomes "Apartments", and rows with an empty
/// `address` are dropped.
pub fn parse_csv(text: &str) -> Vec<AccessCodeRecord> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalized.split('\n').filter(|line| !line.trim().is_empty());

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns = Columns::from_header(header);

    let mut dropped = 0usize;
    let records: Vec<AccessCodeRecord> = lines
        .filter_map(|line| {
            let record = parse_row(&columns, line);
            if record.is_none() {
                dropped += 1;
            }
            record
        })
        .collect();

    debug!(records = records.len(), dropped, "Parsed dataset");
    records
}

fn parse_row(columns: &Columns, line: &str) -> Option<AccessCodeRecord> {
    let cells = split_line(line);
    let get = |column: Option<usize>| -> String {
        column
            .and_then(|i| cells.get(i))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let address = get(columns.address);
    if address.is_empty() {
        return None;
    }

    Some(AccessCodeRecord {
        community: non_empty_or(get(columns.community), DEFAULT_COMMUNITY),
        address,
        gate: get(columns.gate),
        kind: non_empty_or(get(columns.kind), DEFAULT_TYPE),
    })
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
