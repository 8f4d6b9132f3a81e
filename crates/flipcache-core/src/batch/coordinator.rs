use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::{MutationField, Reply, Request};
use crate::backend::{Backend, BackendCommand};
use crate::cache::categories::{DASHBOARD, PROJECT, PROJECTS};
use crate::cache::EntityCache;
use crate::error::SyncError;

/// Latest value for one `(field, entity)` plus everyone waiting on it.
struct Pending {
    value: String,
    waiters: Vec<Reply>,
}

/// Keyed by field first so iteration walks one field group at a time.
type Batch = BTreeMap<(MutationField, i64), Pending>;

pub(super) struct Coordinator {
    backend: Arc<dyn Backend>,
    cache: EntityCache,
    window: Duration,
}

impl Coordinator {
    pub(super) fn new(backend: Arc<dyn Backend>, cache: EntityCache, window: Duration) -> Self {
        Self {
            backend,
            cache,
            window,
        }
    }

    pub(super) async fn run(self, mut rx: mpsc::UnboundedReceiver<Request>) {
        let mut batch = Batch::new();

        // Idle: block until the first edit of a window arrives.
        while let Some(request) = rx.recv().await {
            Self::add(&mut batch, request);

            let mut deadline = Instant::now() + self.window;
            let mut closed = false;

            // Collecting: every new edit pushes the deadline back.
            loop {
                tokio::select! {
                    request = rx.recv() => match request {
                        Some(request) => {
                            Self::add(&mut batch, request);
                            deadline = Instant::now() + self.window;
                        }
                        None => {
                            closed = true;
                            break;
                        }
                    },
                    _ = sleep_until(deadline) => break,
                }
            }

            // Flushing: edits arriving now wait in the channel for the next window.
            self.flush(std::mem::take(&mut batch)).await;

            if closed {
                break;
            }
        }

        debug!("Mutation coordinator stopped");
    }

    fn add(batch: &mut Batch, request: Request) {
        let Request { mutation, reply } = request;
        let key = (mutation.field, mutation.entity_id);
        match batch.get_mut(&key) {
            Some(pending) => {
                debug!(
                    entity_id = mutation.entity_id,
                    field = %mutation.field,
                    replaced = %pending.value,
                    value = %mutation.value,
                    "Collapsing queued edit"
                );
                pending.value = mutation.value;
                pending.waiters.push(reply);
            }
            None => {
                batch.insert(
                    key,
                    Pending {
                        value: mutation.value,
                        waiters: vec![reply],
                    },
                );
            }
        }
    }

    async fn flush(&self, batch: Batch) {
        if batch.is_empty() {
            return;
        }

        let mut group_sizes: BTreeMap<MutationField, usize> = BTreeMap::new();
        for (field, _) in batch.keys() {
            *group_sizes.entry(*field).or_default() += 1;
        }
        for (field, count) in &group_sizes {
            debug!(field = %field, count, "Dispatching mutation group");
        }

        let calls = batch.iter().map(|((field, id), pending)| {
            let command = BackendCommand::update_project_field(*id, *field, &pending.value);
            let backend = Arc::clone(&self.backend);
            async move { backend.call(&command).await }
        });
        let results = join_all(calls).await;

        // Invalidate before settling so a caller that reloads right after its
        // edit resolves never sees pre-edit data.
        self.cache.invalidate(PROJECTS);
        self.cache.invalidate(DASHBOARD);
        let mut touched: Vec<i64> = batch.keys().map(|(_, id)| *id).collect();
        touched.sort_unstable();
        touched.dedup();
        for id in &touched {
            self.cache.invalidate((PROJECT, *id));
        }

        let mut failed = 0;
        for (((field, id), pending), result) in batch.into_iter().zip(results) {
            let outcome = match result {
                Ok(_) => Ok(()),
                Err(e) => {
                    failed += 1;
                    warn!(entity_id = id, field = %field, value = %pending.value, error = %e, "Field update failed");
                    Err(SyncError::from(e))
                }
            };
            for waiter in pending.waiters {
                // A waiter whose caller went away is fine to skip.
                let _ = waiter.send(outcome.clone());
            }
        }

        info!(
            dispatched = group_sizes.values().sum::<usize>(),
            failed,
            projects = touched.len(),
            "Mutation batch flushed"
        );
    }
}
