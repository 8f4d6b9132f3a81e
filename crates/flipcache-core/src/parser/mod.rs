//! Tolerant parser for the backend's terminal-table output.
//!
//! Parsing never fails as a whole. Layout lines (titles, rules, headers,
//! wrapped-cell continuations) are skipped silently; a data row that cannot
//! be mapped to a record is discarded, logged, and counted in
//! [`Parsed::discarded`]. Parsing is a pure function of its input.
//!
//! Duplicate ids are returned as-is, in order. Callers that index by id
//! should let the last occurrence win.

pub mod cells;
pub mod records;
pub mod table;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{ExpenseRecord, ProjectRecord, RoomRecord};

pub use cells::parse_currency;
pub use records::RowError;
pub use table::{classify_lines, split_cells, LineKind, ParsedRow};

/// Which table a raw response holds. Per-project tables carry the project
/// id because the backend does not print it in the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Projects,
    Expenses { project_id: i64 },
    Rooms { project_id: i64 },
}

impl RecordKind {
    /// Money-bearing tables only accept rows that show a currency marker.
    pub fn is_money_bearing(&self) -> bool {
        matches!(self, RecordKind::Projects | RecordKind::Expenses { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Projects => "projects",
            RecordKind::Expenses { .. } => "expenses",
            RecordKind::Rooms { .. } => "rooms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedRecord {
    Project(ProjectRecord),
    Expense(ExpenseRecord),
    Room(RoomRecord),
}

/// Records recovered from one response plus the number of data rows dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub discarded: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            discarded: 0,
        }
    }
}

impl<T> Parsed<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Parsed<U> {
        Parsed {
            records: self.records.into_iter().map(f).collect(),
            discarded: self.discarded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Extract the data rows of a response. Rows without a currency marker in a
/// money-bearing table come back as errors so they are counted.
pub fn data_rows(raw: &str, money_bearing: bool) -> Vec<Result<ParsedRow, (usize, RowError)>> {
    classify_lines(raw)
        .into_iter()
        .filter(|(_, _, kind)| *kind == LineKind::Data)
        .map(|(line_no, line, _)| {
            if money_bearing && !cells::has_currency_marker(line) {
                return Err((line_no, RowError::MissingCurrency));
            }
            Ok(ParsedRow {
                line_no,
                cells: split_cells(line),
            })
        })
        .collect()
}

fn parse_rows<T>(
    raw: &str,
    kind: RecordKind,
    map: impl Fn(&ParsedRow) -> Result<T, RowError>,
) -> Parsed<T> {
    let mut parsed = Parsed::default();

    for row in data_rows(raw, kind.is_money_bearing()) {
        let result = row.and_then(|row| map(&row).map_err(|e| (row.line_no, e)));
        match result {
            Ok(record) => parsed.records.push(record),
            Err((line_no, error)) => {
                debug!(table = kind.label(), line = line_no, error = %error, "Discarding table row");
                parsed.discarded += 1;
            }
        }
    }

    if parsed.discarded > 0 {
        warn!(
            table = kind.label(),
            parsed = parsed.records.len(),
            discarded = parsed.discarded,
            "Some table rows could not be parsed"
        );
    }

    parsed
}

pub fn parse_projects(raw: &str) -> Parsed<ProjectRecord> {
    parse_rows(raw, RecordKind::Projects, records::project_from_row)
}

pub fn parse_expenses(raw: &str, project_id: i64) -> Parsed<ExpenseRecord> {
    parse_rows(raw, RecordKind::Expenses { project_id }, |row| {
        records::expense_from_row(row, project_id)
    })
}

pub fn parse_rooms(raw: &str, project_id: i64) -> Parsed<RoomRecord> {
    parse_rows(raw, RecordKind::Rooms { project_id }, |row| {
        records::room_from_row(row, project_id)
    })
}

/// Parse any table kind into the untyped record enum.
pub fn parse(raw: &str, kind: RecordKind) -> Parsed<ParsedRecord> {
    match kind {
        RecordKind::Projects => parse_projects(raw).map(ParsedRecord::Project),
        RecordKind::Expenses { project_id } => parse_expenses(raw, project_id).map(ParsedRecord::Expense),
        RecordKind::Rooms { project_id } => parse_rooms(raw, project_id).map(ParsedRecord::Room),
    }
}
