//! Screen loaders: project list, dashboard and project detail.
//!
//! Every loader checks the entity cache first. On a miss it fetches the raw
//! tables, parses them and writes the composed result back under a
//! generation token, so a slow response that lost the race to a newer
//! fetch or an invalidation is dropped instead of cached.
//!
//! The project list fans out two calls per project (expenses and rooms),
//! at most `max_concurrent_fetches` projects at a time. A project whose
//! detail calls fail keeps zero-value metrics instead of failing the list.

mod mutations;

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendCommand};
use crate::batch::MutationBatcher;
use crate::cache::categories::{DASHBOARD, EXPENSES, PROJECT, PROJECTS, ROOMS};
use crate::cache::{CacheStats, EntityCache};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{
    ExpenseRecord, PortfolioSummary, ProjectDetail, ProjectRecord, ProjectViewModel, RoomRecord,
};
use crate::parser;

/// Entry point for the UI. Clone is cheap; clones share the cache and the
/// mutation batcher.
#[derive(Clone)]
pub struct SyncOrchestrator {
    backend: Arc<dyn Backend>,
    cache: EntityCache,
    config: SyncConfig,
    batcher: MutationBatcher,
}

impl SyncOrchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        cache: EntityCache,
        config: SyncConfig,
        batcher: MutationBatcher,
    ) -> Self {
        Self {
            backend,
            cache,
            config,
            batcher,
        }
    }

    /// Fresh cache and a batcher using the configured debounce window.
    /// Must be called inside a tokio runtime.
    pub fn with_backend(backend: Arc<dyn Backend>, config: SyncConfig) -> Self {
        let cache = EntityCache::new();
        let batcher = MutationBatcher::spawn(Arc::clone(&backend), cache.clone(), config.debounce());
        Self::new(backend, cache, config, batcher)
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// All projects with their derived spend and room metrics.
    pub async fn load_projects(&self) -> Result<Vec<ProjectViewModel>, SyncError> {
        if let Some(cached) = self.cache.get::<Vec<ProjectViewModel>>(PROJECTS) {
            debug!(count = cached.len(), "Project list served from cache");
            return Ok(cached);
        }

        let projects_generation = self.cache.begin(PROJECTS);
        let dashboard_generation = self.cache.begin(DASHBOARD);

        let records = self.fetch_project_records().await?;
        let total = records.len();

        let views: Vec<ProjectViewModel> = stream::iter(records)
            .map(|project| self.project_view(project))
            .buffered(self.config.max_concurrent())
            .collect()
            .await;

        let summary = PortfolioSummary::from_projects(&views);
        let stored = self.cache.set_if_current(
            PROJECTS,
            projects_generation,
            views.clone(),
            self.config.projects_ttl(),
        );
        self.cache.set_if_current(
            DASHBOARD,
            dashboard_generation,
            summary.clone(),
            self.config.dashboard_ttl(),
        );

        info!(
            projects = total,
            incomplete = summary.incomplete_count,
            cached = stored,
            "Project list loaded"
        );
        Ok(views)
    }

    /// Portfolio totals. Reuses a cached project list when only the
    /// aggregate has expired.
    pub async fn load_dashboard(&self) -> Result<PortfolioSummary, SyncError> {
        if let Some(cached) = self.cache.get::<PortfolioSummary>(DASHBOARD) {
            debug!("Dashboard served from cache");
            return Ok(cached);
        }

        let generation = self.cache.begin(DASHBOARD);
        let views = self.load_projects().await?;
        if let Some(fresh) = self.cache.get::<PortfolioSummary>(DASHBOARD) {
            return Ok(fresh);
        }

        let summary = PortfolioSummary::from_projects(&views);
        self.cache
            .set_if_current(DASHBOARD, generation, summary.clone(), self.config.dashboard_ttl());
        Ok(summary)
    }

    /// One project with its expenses, rooms and budget breakdown. Unlike the
    /// list, a failing sub-fetch fails the whole load.
    pub async fn load_project_detail(&self, id: i64) -> Result<ProjectDetail, SyncError> {
        if let Some(cached) = self.cache.get::<ProjectDetail>((PROJECT, id)) {
            debug!(project_id = id, "Project detail served from cache");
            return Ok(cached);
        }

        let generation = self.cache.begin((PROJECT, id));
        let (project, expenses, rooms) =
            tokio::try_join!(self.project_record(id), self.expenses(id), self.rooms(id))?;
        let project = project.ok_or(SyncError::NotFound(id))?;

        let detail = ProjectDetail::compose(project, expenses, rooms);
        self.cache
            .set_if_current((PROJECT, id), generation, detail.clone(), self.config.detail_ttl());
        Ok(detail)
    }

    async fn fetch_project_records(&self) -> Result<Vec<ProjectRecord>, SyncError> {
        let raw = self.backend.call(&BackendCommand::list_projects()).await?;
        Ok(last_occurrence_wins(parser::parse_projects(&raw).records))
    }

    /// Project record from the cached list if present, else from a fresh
    /// project table (without the per-project fan-out).
    async fn project_record(&self, id: i64) -> Result<Option<ProjectRecord>, SyncError> {
        if let Some(views) = self.cache.get::<Vec<ProjectViewModel>>(PROJECTS) {
            if let Some(vm) = views.into_iter().find(|vm| vm.project.id == id) {
                return Ok(Some(vm.project));
            }
        }
        let records = self.fetch_project_records().await?;
        Ok(records.into_iter().find(|p| p.id == id))
    }

    async fn expenses(&self, project_id: i64) -> Result<Vec<ExpenseRecord>, SyncError> {
        if let Some(cached) = self.cache.get::<Vec<ExpenseRecord>>((EXPENSES, project_id)) {
            return Ok(cached);
        }
        let generation = self.cache.begin((EXPENSES, project_id));
        let raw = self
            .backend
            .call(&BackendCommand::list_expenses(project_id))
            .await?;
        let expenses = parser::parse_expenses(&raw, project_id).records;
        self.cache.set_if_current(
            (EXPENSES, project_id),
            generation,
            expenses.clone(),
            self.config.detail_ttl(),
        );
        Ok(expenses)
    }

    async fn rooms(&self, project_id: i64) -> Result<Vec<RoomRecord>, SyncError> {
        if let Some(cached) = self.cache.get::<Vec<RoomRecord>>((ROOMS, project_id)) {
            return Ok(cached);
        }
        let generation = self.cache.begin((ROOMS, project_id));
        let raw = self.backend.call(&BackendCommand::list_rooms(project_id)).await?;
        let rooms = parser::parse_rooms(&raw, project_id).records;
        self.cache.set_if_current(
            (ROOMS, project_id),
            generation,
            rooms.clone(),
            self.config.detail_ttl(),
        );
        Ok(rooms)
    }

    async fn project_view(&self, project: ProjectRecord) -> ProjectViewModel {
        let id = project.id;
        match tokio::join!(self.expenses(id), self.rooms(id)) {
            (Ok(expenses), Ok(rooms)) => ProjectViewModel::compose(project, &expenses, &rooms),
            (expenses, rooms) => {
                let error = expenses.err().or(rooms.err());
                warn!(
                    project_id = id,
                    error = ?error.map(|e| e.to_string()),
                    "Project details unavailable, using zero values"
                );
                ProjectViewModel::without_details(project)
            }
        }
    }
}

/// Keep the last record for each id, in the order those last records appear.
fn last_occurrence_wins(records: Vec<ProjectRecord>) -> Vec<ProjectRecord> {
    let mut last_index: HashMap<i64, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last_index.insert(record.id, i);
    }
    records
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(&record.id) == Some(i))
        .map(|(_, record)| record)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
