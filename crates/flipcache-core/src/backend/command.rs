use std::fmt;

use serde::Serialize;

use crate::batch::MutationField;
use crate::models::{NewExpense, NewProject, NewRoom, ProjectUpdate};

/// One backend invocation, as the argument vector the tracker CLI expects.
///
/// The HTTP transport forwards the same vector, so both transports share
/// one command vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BackendCommand {
    pub argv: Vec<String>,
}

impl BackendCommand {
    fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    fn flag(mut self, name: &str, value: impl ToString) -> Self {
        self.argv.push(format!("--{}", name));
        self.argv.push(value.to_string());
        self
    }

    fn flag_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.flag(name, value),
            None => self,
        }
    }

    /// Destructive commands never prompt behind an RPC.
    fn force(mut self) -> Self {
        self.argv.push("--force".to_string());
        self
    }

    pub fn list_projects() -> Self {
        Self::new(["project", "list"])
    }

    pub fn list_expenses(project_id: i64) -> Self {
        Self::new(["expense".to_string(), "list".to_string(), project_id.to_string()])
    }

    pub fn list_rooms(project_id: i64) -> Self {
        Self::new(["room".to_string(), "list".to_string(), project_id.to_string()])
    }

    /// `project update <id> --status <value>` and friends.
    pub fn update_project_field(id: i64, field: MutationField, value: &str) -> Self {
        Self::new(["project".to_string(), "update".to_string(), id.to_string()])
            .flag(field.as_str(), value)
    }

    pub fn create_project(project: &NewProject) -> Self {
        Self::new([
            "project".to_string(),
            "create".to_string(),
            project.name.clone(),
            project.budget.to_plain_dollars(),
            project.property_type.clone(),
            project.property_class.clone(),
        ])
        .flag_opt("description", project.description.as_ref())
        .flag_opt("floors", project.floors)
        .flag_opt("sqft", project.sqft)
        .flag_opt("address", project.address.as_ref())
    }

    pub fn update_project(id: i64, update: &ProjectUpdate) -> Self {
        Self::new(["project".to_string(), "update".to_string(), id.to_string()])
            .flag_opt("name", update.name.as_ref())
            .flag_opt("budget", update.budget.map(|b| b.to_plain_dollars()))
            .flag_opt("description", update.description.as_ref())
            .flag_opt("address", update.address.as_ref())
            .flag_opt("status", update.status.map(|s| s.as_str()))
            .flag_opt("priority", update.priority.map(|p| p.as_str()))
    }

    pub fn delete_project(id: i64) -> Self {
        Self::new(["project".to_string(), "delete".to_string(), id.to_string()]).force()
    }

    pub fn add_expense(project_id: i64, expense: &NewExpense) -> Self {
        Self::new([
            "expense".to_string(),
            "add".to_string(),
            project_id.to_string(),
            expense.room_name.clone(),
            expense.category.as_str().to_string(),
            expense.cost.to_plain_dollars(),
        ])
        .flag_opt("hours", expense.hours)
        .flag_opt("condition", expense.condition)
        .flag_opt("notes", expense.notes.as_ref())
    }

    pub fn delete_expense(expense_id: i64) -> Self {
        Self::new(["expense".to_string(), "delete".to_string(), expense_id.to_string()]).force()
    }

    pub fn add_room(project_id: i64, room: &NewRoom) -> Self {
        Self::new([
            "room".to_string(),
            "add".to_string(),
            project_id.to_string(),
            room.name.clone(),
            room.floor.to_string(),
        ])
        .flag_opt("length", room.length)
        .flag_opt("width", room.width)
        .flag_opt("height", room.height)
        .flag_opt("condition", room.condition)
        .flag_opt("notes", room.notes.as_ref())
    }

    pub fn delete_room(project_id: i64, name: &str) -> Self {
        Self::new([
            "room".to_string(),
            "delete".to_string(),
            project_id.to_string(),
            name.to_string(),
        ])
        .force()
    }

    /// True if this command's argv begins with `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.argv.len() >= prefix.len() && self.argv.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}
