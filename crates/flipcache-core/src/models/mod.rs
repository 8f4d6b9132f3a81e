//! Data models for renovation tracker entities.
//!
//! This module contains the typed records produced by the table parser
//! and the view models handed to the UI:
//!
//! - `ProjectRecord`, `ExpenseRecord`, `RoomRecord`: one row of a backend table
//! - `Money`: currency in integer cents
//! - `ProjectViewModel`, `PortfolioSummary`, `ProjectDetail`: composed screen data
//! - `NewProject`, `NewExpense`, `NewRoom`, `ProjectUpdate`: mutation payloads

pub mod expense;
pub mod money;
pub mod project;
pub mod room;
pub mod view;

pub use expense::{ExpenseCategory, ExpenseRecord, NewExpense};
pub use money::Money;
pub use project::{NewProject, Priority, ProjectRecord, ProjectStatus, ProjectUpdate};
pub use room::{NewRoom, RoomRecord};
pub use view::{
    completion_pct, BudgetBreakdown, PortfolioSummary, ProjectDetail, ProjectViewModel, RoomSpend,
    StatusCounts,
};
