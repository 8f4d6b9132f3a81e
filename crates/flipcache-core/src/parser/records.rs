//! Positional row-to-record mapping for each table kind.
//!
//! Column positions are a backend convention, not self-describing:
//!
//! - projects: `ID │ Name │ Status │ Priority │ Budget │ Type │ Created`
//!   (older backends omit Priority)
//! - expenses: `Date │ Room │ Category │ Cost │ Hours │ Notes`
//!   (backends that expose ids prefix an `ID` column)
//! - rooms:    `Name │ Floor │ Size │ Condition │ Notes`

use thiserror::Error;

use super::cells::{parse_condition, parse_currency, parse_hours, parse_id, parse_square_feet};
use super::table::ParsedRow;
use crate::models::{
    ExpenseCategory, ExpenseRecord, Money, Priority, ProjectRecord, ProjectStatus, RoomRecord,
};
use crate::utils::normalize_token;

pub const PROJECT_MIN_CELLS: usize = 5;
pub const LEGACY_PROJECT_MIN_CELLS: usize = 4;
pub const EXPENSE_MIN_CELLS: usize = 4;
pub const EXPENSE_WITH_ID_MIN_CELLS: usize = 5;
pub const ROOM_MIN_CELLS: usize = 2;

/// Why a single row was discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("expected at least {required} cells, found {found}")]
    TooFewCells { found: usize, required: usize },

    #[error("no currency marker on a money-bearing row")]
    MissingCurrency,

    #[error("column {column}: {value:?} is not an integer")]
    InvalidInteger { column: &'static str, value: String },

    #[error("column {column}: {value:?} is not a currency amount")]
    InvalidCurrency { column: &'static str, value: String },

    #[error("column {column}: unrecognized value {value:?}")]
    InvalidValue { column: &'static str, value: String },
}

fn require_cells(row: &ParsedRow, required: usize) -> Result<(), RowError> {
    if row.len() < required {
        return Err(RowError::TooFewCells {
            found: row.len(),
            required,
        });
    }
    Ok(())
}

fn cell<'a>(row: &'a ParsedRow, index: usize) -> &'a str {
    row.cell(index).unwrap_or("")
}

fn id_at(row: &ParsedRow, index: usize, column: &'static str) -> Result<i64, RowError> {
    parse_id(cell(row, index)).ok_or_else(|| RowError::InvalidInteger {
        column,
        value: cell(row, index).to_string(),
    })
}

fn money_at(row: &ParsedRow, index: usize, column: &'static str) -> Result<Money, RowError> {
    parse_currency(cell(row, index)).ok_or_else(|| RowError::InvalidCurrency {
        column,
        value: cell(row, index).to_string(),
    })
}

/// Join trailing cells into one free-text field.
fn rest_from(row: &ParsedRow, index: usize) -> Option<String> {
    if index >= row.len() {
        return None;
    }
    Some(row.cells[index..].join(" "))
}

/// Map a project row. A row whose fourth cell is already a currency amount
/// comes from a backend that predates the priority column; it gets the
/// default priority.
pub fn project_from_row(row: &ParsedRow) -> Result<ProjectRecord, RowError> {
    require_cells(row, LEGACY_PROJECT_MIN_CELLS)?;
    let legacy = parse_currency(cell(row, 3)).is_some();
    if !legacy {
        require_cells(row, PROJECT_MIN_CELLS)?;
    }

    let id = id_at(row, 0, "id")?;
    let name = cell(row, 1).to_string();
    let status = ProjectStatus::parse(cell(row, 2)).ok_or_else(|| RowError::InvalidValue {
        column: "status",
        value: cell(row, 2).to_string(),
    })?;

    let (priority, budget_at) = if legacy {
        (Priority::default(), 3)
    } else {
        let priority = Priority::parse(cell(row, 3)).ok_or_else(|| RowError::InvalidValue {
            column: "priority",
            value: cell(row, 3).to_string(),
        })?;
        (priority, 4)
    };
    let budget = money_at(row, budget_at, "budget")?;

    Ok(ProjectRecord {
        id,
        name,
        status,
        priority,
        budget,
        property_type: normalize_token(cell(row, budget_at + 1)),
        created_date: cell(row, budget_at + 2).to_string(),
    })
}

/// Map an expense row. The backend's list prints no id column; when the
/// fourth cell is a currency amount the row is read that way and carries
/// no id.
pub fn expense_from_row(row: &ParsedRow, project_id: i64) -> Result<ExpenseRecord, RowError> {
    require_cells(row, EXPENSE_MIN_CELLS)?;
    let (id, date_at) = if parse_currency(cell(row, 3)).is_some() {
        (None, 0)
    } else {
        require_cells(row, EXPENSE_WITH_ID_MIN_CELLS)?;
        (Some(id_at(row, 0, "id")?), 1)
    };

    let category_at = date_at + 2;
    let category =
        ExpenseCategory::parse(cell(row, category_at)).ok_or_else(|| RowError::InvalidValue {
            column: "category",
            value: cell(row, category_at).to_string(),
        })?;
    let cost = money_at(row, date_at + 3, "cost")?;

    // An empty hours cell is dropped by the splitter, so a non-numeric
    // cell after the cost is the start of the notes.
    let hours_at = date_at + 4;
    let (hours, notes_at) = match row.cell(hours_at).map(parse_hours) {
        Some(Some(hours)) => (hours, hours_at + 1),
        Some(None) => (None, hours_at),
        None => (None, hours_at + 1),
    };

    Ok(ExpenseRecord {
        id,
        project_id,
        date: cell(row, date_at).to_string(),
        room_name: cell(row, date_at + 1).to_string(),
        category,
        cost,
        hours,
        notes: rest_from(row, notes_at),
    })
}

pub fn room_from_row(row: &ParsedRow, project_id: i64) -> Result<RoomRecord, RowError> {
    require_cells(row, ROOM_MIN_CELLS)?;

    let floor = cell(row, 1).parse::<i32>().map_err(|_| RowError::InvalidInteger {
        column: "floor",
        value: cell(row, 1).to_string(),
    })?;

    Ok(RoomRecord {
        project_id,
        name: cell(row, 0).to_string(),
        floor,
        square_feet: row.cell(2).and_then(parse_square_feet),
        condition: row.cell(3).and_then(parse_condition),
        notes: rest_from(row, 4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> ParsedRow {
        ParsedRow {
            line_no: 1,
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_project_row_current_layout() {
        let p = project_from_row(&row(&[
            "7", "Oak Duplex", "On Hold", "Urgent", "$98,500", "Multifamily", "2024-03-09",
        ]))
        .unwrap();
        assert_eq!(p.id, 7);
        assert_eq!(p.status, ProjectStatus::OnHold);
        assert_eq!(p.priority, Priority::Urgent);
        assert_eq!(p.budget, Money::from_dollars(98_500));
        assert_eq!(p.property_type, "multifamily");
    }

    #[test]
    fn test_project_row_legacy_layout_defaults_priority() {
        let p = project_from_row(&row(&[
            "3", "Elm Cottage", "In Progress", "$75,000", "Single Family", "2023-11-30",
        ]))
        .unwrap();
        assert_eq!(p.priority, Priority::Medium);
        assert_eq!(p.budget, Money::from_dollars(75_000));
        assert_eq!(p.property_type, "single_family");
        assert_eq!(p.created_date, "2023-11-30");
    }

    #[test]
    fn test_project_row_partial_record_when_trailing_cells_missing() {
        let p = project_from_row(&row(&["4", "Short", "Planning", "Low", "$10"])).unwrap();
        assert_eq!(p.property_type, "");
        assert_eq!(p.created_date, "");
    }

    #[test]
    fn test_project_row_errors() {
        assert_eq!(
            project_from_row(&row(&["1", "x", "Planning"])),
            Err(RowError::TooFewCells { found: 3, required: 4 })
        );
        assert!(matches!(
            project_from_row(&row(&["one", "x", "Planning", "High", "$1"])),
            Err(RowError::InvalidInteger { column: "id", .. })
        ));
        assert!(matches!(
            project_from_row(&row(&["1", "x", "Demolished", "High", "$1"])),
            Err(RowError::InvalidValue { column: "status", .. })
        ));
        assert!(matches!(
            project_from_row(&row(&["1", "x", "Planning", "High", "lots"])),
            Err(RowError::InvalidCurrency { column: "budget", .. })
        ));
    }

    #[test]
    fn test_expense_row_hours_and_notes() {
        let e = expense_from_row(
            &row(&["12", "2024-02-01", "Kitchen", "Labor", "$1,200.00", "16.0", "Cabinet", "install"]),
            5,
        )
        .unwrap();
        assert_eq!(e.id, Some(12));
        assert_eq!(e.project_id, 5);
        assert_eq!(e.category, ExpenseCategory::Labor);
        assert_eq!(e.cost, Money::from_dollars(1_200));
        assert_eq!(e.hours, Some(16.0));
        assert_eq!(e.notes.as_deref(), Some("Cabinet install"));

        let e = expense_from_row(&row(&["13", "2024-02-02", "Bath", "Material", "$80.25", "-"]), 5).unwrap();
        assert_eq!(e.hours, None);
        assert_eq!(e.notes, None);

        let e = expense_from_row(&row(&["14", "2024-02-03", "Bath", "Material", "$5.00", "grout"]), 5).unwrap();
        assert_eq!(e.hours, None);
        assert_eq!(e.notes.as_deref(), Some("grout"));
    }

    #[test]
    fn test_expense_row_without_id_column() {
        let e = expense_from_row(
            &row(&["2024-02-01", "Kitchen", "Labor", "$1,200.00", "16.0", "Cabinet install"]),
            5,
        )
        .unwrap();
        assert_eq!(e.id, None);
        assert_eq!(e.date, "2024-02-01");
        assert_eq!(e.room_name, "Kitchen");
        assert_eq!(e.category, ExpenseCategory::Labor);
        assert_eq!(e.cost, Money::from_dollars(1_200));
        assert_eq!(e.hours, Some(16.0));
        assert_eq!(e.notes.as_deref(), Some("Cabinet install"));

        let e = expense_from_row(&row(&["2024-02-02", "Bath", "Material", "$80.25", "-"]), 5).unwrap();
        assert_eq!(e.cost, Money::from_cents(8_025));
        assert_eq!(e.hours, None);
        assert_eq!(e.notes, None);

        assert_eq!(
            expense_from_row(&row(&["2024-02-02", "Bath", "Material"]), 5),
            Err(RowError::TooFewCells { found: 3, required: 4 })
        );
        assert!(matches!(
            expense_from_row(&row(&["2024-02-02", "Bath", "Material", "cheap"]), 5),
            Err(RowError::TooFewCells { found: 4, required: 5 })
        ));
    }

    #[test]
    fn test_room_row() {
        let r = room_from_row(&row(&["Living Room", "1", "300 sq ft", "2/5", "Hardwood"]), 9).unwrap();
        assert_eq!(r.project_id, 9);
        assert_eq!(r.floor, 1);
        assert_eq!(r.square_feet, Some(300.0));
        assert_eq!(r.condition, Some(2));
        assert_eq!(r.notes.as_deref(), Some("Hardwood"));

        let r = room_from_row(&row(&["Attic", "3", "Not set", "4/5"]), 9).unwrap();
        assert_eq!(r.square_feet, None);
        assert_eq!(r.notes, None);

        assert!(room_from_row(&row(&["Attic", "top"]), 9).is_err());
    }
}
