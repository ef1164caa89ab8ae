use std::sync::Arc;

use sppg_core::{AppError, AppResult};
use sppg_domain::{EntitySchema, FilterValue};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::gateway_ports::{EntityGateway, ListPage, ListRequest, TokenProvider, require_token};
use crate::query_builder::QueryBuilder;

mod machine;

pub use machine::{FetchMode, FetchOutcome, ListMachine, ListPhase, ListState, PendingFetch};

/// Owns the list state of one open entity screen and drives its fetches.
///
/// The state lock is never held across a network call, so a newer
/// search/filter/refresh may start while an older fetch is still in flight;
/// the older response is then discarded by sequence number.
pub struct ListController {
    schema: Arc<EntitySchema>,
    machine: Mutex<ListMachine>,
    gateway: Arc<dyn EntityGateway>,
    token_provider: Arc<dyn TokenProvider>,
}

impl ListController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(
        schema: Arc<EntitySchema>,
        gateway: Arc<dyn EntityGateway>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            machine: Mutex::new(ListMachine::new(schema.clone())),
            schema,
            gateway,
            token_provider,
        }
    }

    /// Returns the entity schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> ListState {
        self.machine.lock().await.state().clone()
    }

    /// Loads the first page.
    pub async fn mount(&self) -> AppResult<ListState> {
        let pending = self.machine.lock().await.begin_mount()?;
        self.drive(pending).await
    }

    /// Replaces the search text and reloads from the first page.
    pub async fn set_search(&self, search_text: &str) -> AppResult<ListState> {
        let pending = self
            .machine
            .lock()
            .await
            .begin_set_search(Some(search_text))?;
        self.drive(pending).await
    }

    /// Sets one filter, or clears it with `None`, and reloads from the first page.
    pub async fn set_filter(&self, key: &str, value: Option<FilterValue>) -> AppResult<ListState> {
        let pending = self.machine.lock().await.begin_set_filter(key, value)?;
        self.drive(pending).await
    }

    /// Clears every filter and reloads from the first page.
    pub async fn clear_filters(&self) -> AppResult<ListState> {
        let pending = self.machine.lock().await.begin_clear_filters()?;
        self.drive(pending).await
    }

    /// Re-runs the active query from the first page.
    pub async fn refresh(&self) -> AppResult<ListState> {
        let pending = self.machine.lock().await.begin_refresh();
        self.drive(pending).await
    }

    /// Appends the next page when more rows exist and nothing is in flight.
    pub async fn load_more(&self) -> AppResult<ListState> {
        let pending = self.machine.lock().await.begin_load_more();
        self.drive(pending).await
    }

    /// Abandons the screen; in-flight responses are ignored.
    pub async fn unmount(&self) {
        self.machine.lock().await.unmount();
        debug!(entity_id = %self.schema.entity_id(), "list controller unmounted");
    }

    async fn drive(&self, pending: Option<PendingFetch>) -> AppResult<ListState> {
        let Some(pending) = pending else {
            return Ok(self.snapshot().await);
        };

        let result = self.fetch(&pending).await;
        let mut machine = self.machine.lock().await;
        match result {
            Ok(page) => {
                if machine.on_fetch_success(pending.seq, page) == FetchOutcome::Stale {
                    debug!(
                        entity_id = %self.schema.entity_id(),
                        seq = pending.seq,
                        "discarded superseded list response"
                    );
                }
                Ok(machine.state().clone())
            }
            Err(error) => match machine.on_fetch_failure(pending.seq, error.clone()) {
                FetchOutcome::Applied => Err(error),
                FetchOutcome::Stale => {
                    debug!(
                        entity_id = %self.schema.entity_id(),
                        seq = pending.seq,
                        error = %error,
                        "discarded superseded list failure"
                    );
                    Ok(machine.state().clone())
                }
            },
        }
    }

    async fn fetch(&self, pending: &PendingFetch) -> AppResult<ListPage> {
        let token = require_token(self.token_provider.as_ref()).await?;
        let query = QueryBuilder::to_query_pairs(&self.schema, &pending.query);
        let mut last_error = None;

        for strategy in self.schema.list_endpoints() {
            debug!(
                entity_id = %self.schema.entity_id(),
                seq = pending.seq,
                strategy = strategy.name(),
                page = pending.query.page.page,
                "dispatching list request"
            );

            let request = ListRequest {
                entity_id: self.schema.entity_id().to_owned(),
                path: strategy.path().to_owned(),
                query: query.clone(),
                token: token.clone(),
            };

            match self.gateway.fetch_page(request).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    warn!(
                        entity_id = %self.schema.entity_id(),
                        strategy = strategy.name(),
                        path = strategy.path(),
                        error = %error,
                        "list endpoint strategy failed"
                    );
                    let terminal = error.is_auth() || matches!(error, AppError::Validation(_));
                    last_error = Some(error);
                    if terminal {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Config(format!(
                "entity '{}' declares no list endpoint",
                self.schema.entity_id()
            ))
        }))
    }
}

#[cfg(test)]
mod tests;
