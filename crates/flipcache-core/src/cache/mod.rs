//! In-memory entity cache.
//!
//! This module provides the `EntityCache`, a TTL keyed store shared by the
//! sync orchestrator and the mutation batcher. Entries expire per write;
//! mutations must invalidate the categories they affect:
//!
//! - project create/update/delete and batched field edits: `projects`,
//!   `dashboard`, `project:<id>` (delete also drops `expenses:<id>`, `rooms:<id>`)
//! - expense add/delete: `expenses:<project>`, `dashboard`, `project:<project>`, `projects`
//! - room add: `rooms:<project>`, `project:<project>`, `projects`
//! - room delete: as room add, plus `expenses:<project>` and `dashboard`
//!
//! Nothing is persisted; the cache lives as long as the instance that owns it.

pub mod entity;
pub mod key;

pub use entity::{CacheStats, EntityCache, Generation};
pub use key::CacheKey;

/// Category names used by the loaders.
pub mod categories {
    /// Project list view models (collection key).
    pub const PROJECTS: &str = "projects";
    /// Portfolio aggregate (collection key).
    pub const DASHBOARD: &str = "dashboard";
    /// Project detail, keyed by project id.
    pub const PROJECT: &str = "project";
    /// Parsed expense table, keyed by project id.
    pub const EXPENSES: &str = "expenses";
    /// Parsed room table, keyed by project id.
    pub const ROOMS: &str = "rooms";
}
