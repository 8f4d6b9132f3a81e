//! Client-side synchronization layer for the renovation tracker.
//!
//! The tracker backend only speaks in pre-rendered terminal tables. This crate
//! turns that text into typed records and keeps them coherent for a UI:
//!
//! - `parser`: tolerant box-drawing table parser (projects, expenses, rooms)
//! - `cache`: TTL entity cache with per-key invalidation and generation tokens
//! - `backend`: the RPC boundary (`Backend` trait, CLI and HTTP transports)
//! - `batch`: debounced field-mutation coordinator
//! - `sync`: screen loaders with bounded per-project fan-out
//! - `refresh`: periodic / visibility-driven reload task

pub mod backend;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod refresh;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{Backend, BackendCommand, BackendError, CliBackend, HttpBackend};
pub use batch::{BatchedMutation, MutationBatcher, MutationField};
pub use cache::{CacheKey, CacheStats, EntityCache, Generation};
pub use config::{BackendConfig, Config, SyncConfig};
pub use error::SyncError;
pub use models::{
    BudgetBreakdown, ExpenseCategory, ExpenseRecord, Money, NewExpense, NewProject, NewRoom,
    PortfolioSummary, Priority, ProjectDetail, ProjectRecord, ProjectStatus, ProjectUpdate,
    ProjectViewModel, RoomRecord, RoomSpend,
};
pub use parser::{Parsed, ParsedRecord, RecordKind};
pub use refresh::{spawn_refresh_loop, RefreshEvent, Visibility};
pub use sync::SyncOrchestrator;
