//! Composed view models handed to the UI.
//!
//! These are derived from parsed records and are what the entity cache
//! stores for the project list, dashboard and detail screens.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExpenseCategory, ExpenseRecord, Money, ProjectRecord, ProjectStatus, RoomRecord};

/// Spent / budget as a rounded percentage. Deliberately not clamped, so an
/// over-budget project reports more than 100.
pub fn completion_pct(spent: Money, budget: Money) -> i64 {
    if budget.cents() == 0 {
        return 0;
    }
    (spent.cents() as f64 / budget.cents() as f64 * 100.0).round() as i64
}

/// One entry of the project list screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ProjectViewModel {
    pub project: ProjectRecord,
    pub spent: Money,
    pub remaining: Money,
    pub expense_count: usize,
    pub room_count: usize,
    pub completion_pct: i64,
    /// False when the expense or room fetch for this project failed and the
    /// derived numbers are zero-value defaults.
    pub details_complete: bool,
}

impl ProjectViewModel {
    pub fn compose(project: ProjectRecord, expenses: &[ExpenseRecord], rooms: &[RoomRecord]) -> Self {
        let spent: Money = expenses.iter().map(|e| e.cost).sum();
        Self {
            remaining: project.budget - spent,
            completion_pct: completion_pct(spent, project.budget),
            expense_count: expenses.len(),
            room_count: rooms.len(),
            spent,
            project,
            details_complete: true,
        }
    }

    /// Zero-value metrics for a project whose detail fetches failed.
    pub fn without_details(project: ProjectRecord) -> Self {
        Self {
            remaining: project.budget,
            spent: Money::ZERO,
            expense_count: 0,
            room_count: 0,
            completion_pct: 0,
            project,
            details_complete: false,
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.spent > self.project.budget
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct StatusCounts {
    pub planning: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub on_hold: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ProjectStatus) {
        match status {
            ProjectStatus::Planning => self.planning += 1,
            ProjectStatus::InProgress => self.in_progress += 1,
            ProjectStatus::Completed => self.completed += 1,
            ProjectStatus::OnHold => self.on_hold += 1,
        }
    }
}

/// Portfolio-wide aggregate shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PortfolioSummary {
    pub project_count: usize,
    pub total_budget: Money,
    pub total_spent: Money,
    pub over_budget_count: usize,
    pub incomplete_count: usize,
    pub by_status: StatusCounts,
}

impl PortfolioSummary {
    pub fn from_projects(projects: &[ProjectViewModel]) -> Self {
        let mut summary = PortfolioSummary {
            project_count: projects.len(),
            ..Default::default()
        };
        for vm in projects {
            summary.total_budget = summary.total_budget + vm.project.budget;
            summary.total_spent = summary.total_spent + vm.spent;
            summary.by_status.record(vm.project.status);
            if vm.is_over_budget() {
                summary.over_budget_count += 1;
            }
            if !vm.details_complete {
                summary.incomplete_count += 1;
            }
        }
        summary
    }

    pub fn total_remaining(&self) -> Money {
        self.total_budget - self.total_spent
    }

    pub fn completion_pct(&self) -> i64 {
        completion_pct(self.total_spent, self.total_budget)
    }
}

/// Spend attributed to one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RoomSpend {
    pub room_name: String,
    pub total: Money,
    pub material: Money,
    pub labor: Money,
    pub hours: f64,
}

/// Budget analysis for a single project, mirroring the backend's
/// `budget status` panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct BudgetBreakdown {
    pub total_budget: Money,
    pub total_spent: Money,
    pub remaining: Money,
    pub used_pct: f64,
    pub material_costs: Money,
    pub labor_costs: Money,
    pub labor_hours: f64,
    pub over_budget: bool,
    pub per_room: Vec<RoomSpend>,
}

impl BudgetBreakdown {
    pub fn compute(budget: Money, expenses: &[ExpenseRecord]) -> Self {
        let mut material = Money::ZERO;
        let mut labor = Money::ZERO;
        let mut hours = 0.0;
        let mut rooms: BTreeMap<&str, RoomSpend> = BTreeMap::new();

        for expense in expenses {
            let room = rooms.entry(expense.room_name.as_str()).or_insert_with(|| RoomSpend {
                room_name: expense.room_name.clone(),
                total: Money::ZERO,
                material: Money::ZERO,
                labor: Money::ZERO,
                hours: 0.0,
            });
            room.total = room.total + expense.cost;
            match expense.category {
                ExpenseCategory::Material => {
                    material = material + expense.cost;
                    room.material = room.material + expense.cost;
                }
                ExpenseCategory::Labor => {
                    let h = expense.hours.unwrap_or(0.0);
                    labor = labor + expense.cost;
                    hours += h;
                    room.labor = room.labor + expense.cost;
                    room.hours += h;
                }
            }
        }

        let spent = material + labor;
        let used_pct = if budget.cents() > 0 {
            spent.cents() as f64 / budget.cents() as f64 * 100.0
        } else {
            0.0
        };

        let mut per_room: Vec<RoomSpend> = rooms.into_values().collect();
        per_room.sort_by(|a, b| b.total.cmp(&a.total));

        Self {
            total_budget: budget,
            total_spent: spent,
            remaining: budget - spent,
            used_pct,
            material_costs: material,
            labor_costs: labor,
            labor_hours: hours,
            over_budget: spent > budget,
            per_room,
        }
    }

    /// Average labor rate, if any labor hours were logged.
    pub fn hourly_rate(&self) -> Option<Money> {
        if self.labor_hours > 0.0 {
            Some(Money::from_dollars_f64(self.labor_costs.as_dollars() / self.labor_hours))
        } else {
            None
        }
    }
}

/// Everything the project detail screen needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ProjectDetail {
    pub project: ProjectRecord,
    pub expenses: Vec<ExpenseRecord>,
    pub rooms: Vec<RoomRecord>,
    pub budget: BudgetBreakdown,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub fetched_at: DateTime<Utc>,
}

impl ProjectDetail {
    pub fn compose(project: ProjectRecord, expenses: Vec<ExpenseRecord>, rooms: Vec<RoomRecord>) -> Self {
        let budget = BudgetBreakdown::compute(project.budget, &expenses);
        Self {
            project,
            expenses,
            rooms,
            budget,
            fetched_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else {
            format!("{}h ago", minutes / 60)
        }
    }
}
