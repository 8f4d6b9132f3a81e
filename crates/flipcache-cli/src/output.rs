//! Plain-text rendering of the view models.

use std::fmt::Write;

use chrono::{DateTime, TimeZone};

use flipcache_core::utils::{format_optional, format_percent, truncate_string};
use flipcache_core::{PortfolioSummary, ProjectDetail, ProjectViewModel};

/// Column width for project and room names
const NAME_WIDTH: usize = 24;

/// Column width for free-text notes
const NOTES_WIDTH: usize = 30;

pub fn project_table(projects: &[ProjectViewModel]) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<NAME_WIDTH$}  {:<11}  {:<8}  {:>14}  {:>14}  {:>5}  {:>5}",
        "ID", "Name", "Status", "Priority", "Budget", "Spent", "Used", "Rooms"
    );
    for vm in projects {
        let used = if vm.details_complete {
            format!("{}%", vm.completion_pct)
        } else {
            "?".to_string()
        };
        let _ = writeln!(
            out,
            "{:>4}  {:<NAME_WIDTH$}  {:<11}  {:<8}  {:>14}  {:>14}  {:>5}  {:>5}{}",
            vm.project.id,
            truncate_string(&vm.project.name, NAME_WIDTH),
            vm.project.status.to_string(),
            vm.project.priority.to_string(),
            vm.project.budget.to_string(),
            vm.spent.to_string(),
            used,
            vm.room_count,
            if vm.is_over_budget() { "  over budget" } else { "" },
        );
    }
    if projects.iter().any(|vm| !vm.details_complete) {
        out.push_str("\n? details could not be loaded for this project\n");
    }
    out
}

pub fn dashboard(summary: &PortfolioSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Projects:      {}", summary.project_count);
    let _ = writeln!(out, "Total budget:  {}", summary.total_budget);
    let _ = writeln!(out, "Total spent:   {}", summary.total_spent);
    let _ = writeln!(out, "Remaining:     {}", summary.total_remaining());
    let _ = writeln!(out, "Used:          {}%", summary.completion_pct());
    let _ = writeln!(out, "Over budget:   {}", summary.over_budget_count);
    let s = &summary.by_status;
    let _ = writeln!(
        out,
        "By status:     {} planning, {} in progress, {} completed, {} on hold",
        s.planning, s.in_progress, s.completed, s.on_hold
    );
    if summary.incomplete_count > 0 {
        let _ = writeln!(out, "Incomplete:    {} (details unavailable)", summary.incomplete_count);
    }
    out
}

pub fn project_detail(detail: &ProjectDetail) -> String {
    let p = &detail.project;
    let b = &detail.budget;
    let mut out = String::new();

    let _ = writeln!(out, "{} (#{})", p.name, p.id);
    let _ = writeln!(
        out,
        "{} | {} priority | {} | created {}",
        p.status,
        p.priority,
        if p.property_type.is_empty() { "-" } else { &p.property_type },
        if p.created_date.is_empty() { "-" } else { &p.created_date },
    );
    let _ = writeln!(out, "fetched {}", detail.age_display());

    let _ = writeln!(out, "\nBudget");
    let _ = writeln!(out, "  Total:      {}", b.total_budget);
    let _ = writeln!(out, "  Spent:      {} ({})", b.total_spent, format_percent(b.used_pct));
    let _ = writeln!(
        out,
        "  Remaining:  {}{}",
        b.remaining,
        if b.over_budget { "  OVER BUDGET" } else { "" }
    );
    let _ = writeln!(out, "  Materials:  {}", b.material_costs);
    let _ = writeln!(out, "  Labor:      {} ({:.1} h)", b.labor_costs, b.labor_hours);
    if let Some(rate) = b.hourly_rate() {
        let _ = writeln!(out, "  Labor rate: {}/h", rate);
    }

    if !b.per_room.is_empty() {
        let _ = writeln!(out, "\nSpend by room");
        for room in &b.per_room {
            let _ = writeln!(
                out,
                "  {:<NAME_WIDTH$}  {:>14}  materials {}  labor {}",
                truncate_string(&room.room_name, NAME_WIDTH),
                room.total.to_string(),
                room.material,
                room.labor
            );
        }
    }

    let _ = writeln!(out, "\nExpenses ({})", detail.expenses.len());
    for e in &detail.expenses {
        let id = e.id.map(|id| id.to_string());
        let hours = e.hours.map(|h| format!("{:.1}h", h));
        let _ = writeln!(
            out,
            "  {:>4}  {}  {:<NAME_WIDTH$}  {:<8}  {:>12}  {:>6}  {}",
            format_optional(&id, "-"),
            e.date,
            truncate_string(&e.room_name, NAME_WIDTH),
            e.category.to_string(),
            e.cost.to_string(),
            format_optional(&hours, "-"),
            truncate_string(&format_optional(&e.notes, ""), NOTES_WIDTH),
        );
    }

    let _ = writeln!(out, "\nRooms ({})", detail.rooms.len());
    for r in &detail.rooms {
        let condition = r.condition.map(|c| format!("{}/5", c));
        let _ = writeln!(
            out,
            "  {:<NAME_WIDTH$}  floor {:>2}  {:>12}  condition {}  {}",
            truncate_string(&r.name, NAME_WIDTH),
            r.floor,
            r.display_size(),
            format_optional(&condition, "-"),
            truncate_string(&format_optional(&r.notes, ""), NOTES_WIDTH),
        );
    }

    out
}

/// One line per refresh in `watch` mode.
pub fn refresh_line<Tz>(at: DateTime<Tz>, projects: &[ProjectViewModel]) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let summary = PortfolioSummary::from_projects(projects);
    format!(
        "[{}] {} projects, {} of {} spent, {} over budget",
        at.format("%H:%M:%S"),
        summary.project_count,
        summary.total_spent,
        summary.total_budget,
        summary.over_budget_count
    )
}
