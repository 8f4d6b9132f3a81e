//! Mutation paths. Each one invalidates every cache key whose contents the
//! backend change can affect, whether or not the call succeeded.

use tracing::info;

use super::SyncOrchestrator;
use crate::backend::BackendCommand;
use crate::batch::{BatchedMutation, MutationField};
use crate::cache::categories::{DASHBOARD, EXPENSES, PROJECT, PROJECTS, ROOMS};
use crate::cache::CacheKey;
use crate::error::SyncError;
use crate::models::{NewExpense, NewProject, NewRoom, ProjectUpdate};

impl SyncOrchestrator {
    /// Quick status/priority edit, debounced and batched with other edits.
    pub async fn update_field(
        &self,
        id: i64,
        field: MutationField,
        value: &str,
    ) -> Result<(), SyncError> {
        self.batcher
            .queue(BatchedMutation::new(id, field, value))
            .await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<String, SyncError> {
        let result = self
            .backend
            .call(&BackendCommand::create_project(project))
            .await;
        self.invalidate_all([CacheKey::collection(PROJECTS), CacheKey::collection(DASHBOARD)]);
        let output = result?;
        info!(name = %project.name, "Project created");
        Ok(output)
    }

    pub async fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<String, SyncError> {
        if update.is_empty() {
            return Err(SyncError::EmptyUpdate);
        }
        let result = self
            .backend
            .call(&BackendCommand::update_project(id, update))
            .await;
        self.invalidate_all([
            CacheKey::collection(PROJECTS),
            CacheKey::collection(DASHBOARD),
            CacheKey::entity(PROJECT, id),
        ]);
        Ok(result?)
    }

    pub async fn delete_project(&self, id: i64) -> Result<String, SyncError> {
        let result = self.backend.call(&BackendCommand::delete_project(id)).await;
        self.invalidate_all([
            CacheKey::collection(PROJECTS),
            CacheKey::collection(DASHBOARD),
            CacheKey::entity(PROJECT, id),
            CacheKey::entity(EXPENSES, id),
            CacheKey::entity(ROOMS, id),
        ]);
        let output = result?;
        info!(project_id = id, "Project deleted");
        Ok(output)
    }

    pub async fn add_expense(&self, project_id: i64, expense: &NewExpense) -> Result<String, SyncError> {
        let result = self
            .backend
            .call(&BackendCommand::add_expense(project_id, expense))
            .await;
        self.invalidate_expenses(project_id);
        Ok(result?)
    }

    pub async fn delete_expense(&self, project_id: i64, expense_id: i64) -> Result<String, SyncError> {
        let result = self
            .backend
            .call(&BackendCommand::delete_expense(expense_id))
            .await;
        self.invalidate_expenses(project_id);
        Ok(result?)
    }

    pub async fn add_room(&self, project_id: i64, room: &NewRoom) -> Result<String, SyncError> {
        let result = self
            .backend
            .call(&BackendCommand::add_room(project_id, room))
            .await;
        self.invalidate_all([
            CacheKey::entity(ROOMS, project_id),
            CacheKey::entity(PROJECT, project_id),
            CacheKey::collection(PROJECTS),
        ]);
        Ok(result?)
    }

    /// The backend deletes the room's expenses along with it.
    pub async fn delete_room(&self, project_id: i64, name: &str) -> Result<String, SyncError> {
        let result = self
            .backend
            .call(&BackendCommand::delete_room(project_id, name))
            .await;
        self.invalidate_all([
            CacheKey::entity(ROOMS, project_id),
            CacheKey::entity(EXPENSES, project_id),
            CacheKey::entity(PROJECT, project_id),
            CacheKey::collection(PROJECTS),
            CacheKey::collection(DASHBOARD),
        ]);
        Ok(result?)
    }

    fn invalidate_expenses(&self, project_id: i64) {
        self.invalidate_all([
            CacheKey::entity(EXPENSES, project_id),
            CacheKey::collection(DASHBOARD),
            CacheKey::entity(PROJECT, project_id),
            CacheKey::collection(PROJECTS),
        ]);
    }

    fn invalidate_all<const N: usize>(&self, keys: [CacheKey; N]) {
        for key in keys {
            self.cache.invalidate(key);
        }
    }
}
