//! Scripted backend double and table fixtures shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Backend, BackendCommand, BackendError};
use crate::models::Money;

struct Script {
    prefix: Vec<String>,
    response: Result<String, BackendError>,
    delay: Duration,
}

/// Answers commands by longest matching argv prefix and records every call.
/// Unscripted commands succeed with empty output.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    scripts: Mutex<Vec<Script>>,
    calls: Mutex<Vec<BackendCommand>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self, prefix: &[&str], response: Result<String, BackendError>, delay: Duration) {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        let mut scripts = self.scripts.lock().unwrap();
        scripts.retain(|s| s.prefix != prefix);
        scripts.push(Script { prefix, response, delay });
    }

    pub fn respond(&self, prefix: &[&str], body: impl Into<String>) {
        self.script(prefix, Ok(body.into()), Duration::ZERO);
    }

    pub fn respond_after(&self, prefix: &[&str], body: impl Into<String>, delay: Duration) {
        self.script(prefix, Ok(body.into()), delay);
    }

    pub fn fail(&self, prefix: &[&str], error: BackendError) {
        self.script(prefix, Err(error), Duration::ZERO);
    }

    pub fn calls(&self) -> Vec<BackendCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lookup(&self, command: &BackendCommand) -> (Result<String, BackendError>, Duration) {
        let scripts = self.scripts.lock().unwrap();
        scripts
            .iter()
            .filter(|s| {
                let prefix: Vec<&str> = s.prefix.iter().map(String::as_str).collect();
                command.starts_with(&prefix)
            })
            .max_by_key(|s| s.prefix.len())
            .map(|s| (s.response.clone(), s.delay))
            .unwrap_or((Ok(String::new()), Duration::ZERO))
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn call(&self, command: &BackendCommand) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(command.clone());
        let (response, delay) = self.lookup(command);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Always yield so concurrent callers overlap.
        tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        response
    }
}

/// Rich-style project table: `(id, name, status, priority, budget dollars)`.
pub(crate) fn project_table(rows: &[(i64, &str, &str, &str, i64)]) -> String {
    let mut out = String::from(
        "                Your Real Estate Projects\n\
         ┏━━━━┳━━━━━━━━━━━━━━┳━━━━━━━━━━━━━┳━━━━━━━━━━┳━━━━━━━━━━┳━━━━━━━━━━━━━━━┳━━━━━━━━━━━━┓\n\
         ┃ ID ┃ Name         ┃ Status      ┃ Priority ┃   Budget ┃ Type          ┃ Created    ┃\n\
         ┡━━━━╇━━━━━━━━━━━━━━╇━━━━━━━━━━━━━╇━━━━━━━━━━╇━━━━━━━━━━╇━━━━━━━━━━━━━━━╇━━━━━━━━━━━━┩\n",
    );
    for (id, name, status, priority, budget) in rows {
        let budget = Money::from_dollars(*budget).to_string();
        let budget = budget.trim_end_matches(".00");
        out.push_str(&format!(
            "│ {} │ {} │ {} │ {} │ {} │ Single Family │ 2024-01-01 │\n",
            id, name, status, priority, budget
        ));
    }
    out.push_str("└────┴──────────────┴─────────────┴──────────┴──────────┴───────────────┴────────────┘\n");
    out
}

/// Expense table in the backend's id-less layout: `(room, category, cost cents)`.
pub(crate) fn expense_table(rows: &[(&str, &str, i64)]) -> String {
    let mut out = String::from(
        "                      Expense Details\n\
         ┏━━━━━━━━━━━━┳━━━━━━━━━┳━━━━━━━━━━┳━━━━━━━━━━━┳━━━━━━━┳━━━━━━━┓\n\
         ┃ Date       ┃ Room    ┃ Category ┃      Cost ┃ Hours ┃ Notes ┃\n\
         ┡━━━━━━━━━━━━╇━━━━━━━━━╇━━━━━━━━━━╇━━━━━━━━━━━╇━━━━━━━╇━━━━━━━┩\n",
    );
    for (room, category, cents) in rows {
        out.push_str(&format!(
            "│ 2024-03-01 │ {} │ {} │ {} │ - │ │\n",
            room,
            category,
            Money::from_cents(*cents)
        ));
    }
    out.push_str("└────────────┴─────────┴──────────┴───────────┴───────┴───────┘\n");
    out
}

/// Room table with one row per name, all on floor 1.
pub(crate) fn room_table(names: &[&str]) -> String {
    let mut out = String::from(
        "           Room Details\n\
         ┏━━━━━━━━━┳━━━━━━━┳━━━━━━━━━━━┳━━━━━━━━━━━┳━━━━━━━┓\n\
         ┃ Name    ┃ Floor ┃      Size ┃ Condition ┃ Notes ┃\n\
         ┡━━━━━━━━━╇━━━━━━━╇━━━━━━━━━━━╇━━━━━━━━━━━╇━━━━━━━┩\n",
    );
    for name in names {
        out.push_str(&format!("│ {} │ 1 │ 120 sq ft │ 3/5 │ │\n", name));
    }
    out.push_str("└─────────┴───────┴───────────┴───────────┴───────┘\n");
    out
}
