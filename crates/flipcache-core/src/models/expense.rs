use std::fmt;

use serde::{Deserialize, Serialize};

use super::Money;
use crate::utils::normalize_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum ExpenseCategory {
    Material,
    Labor,
}

impl ExpenseCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_token(s).as_str() {
            "material" | "materials" => Some(ExpenseCategory::Material),
            "labor" | "labour" => Some(ExpenseCategory::Labor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Material => "material",
            ExpenseCategory::Labor => "labor",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseCategory::Material => write!(f, "Material"),
            ExpenseCategory::Labor => write!(f, "Labor"),
        }
    }
}

/// One row of the backend's expense table. Always scoped to one project.
/// `id` is only known when the backend prints an id column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ExpenseRecord {
    pub id: Option<i64>,
    pub project_id: i64,
    pub date: String,
    pub room_name: String,
    pub category: ExpenseCategory,
    pub cost: Money,
    pub hours: Option<f64>,
    pub notes: Option<String>,
}

/// Payload for `expense add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub room_name: String,
    pub category: ExpenseCategory,
    pub cost: Money,
    pub hours: Option<f64>,
    pub condition: Option<u8>,
    pub notes: Option<String>,
}
