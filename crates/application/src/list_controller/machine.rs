use std::collections::BTreeMap;
use std::sync::Arc;

use sppg_core::{AppError, AppResult};
use sppg_domain::{EntitySchema, FilterValue, PaginationScheme, Record, SearchMode};

use crate::gateway_ports::ListPage;
use crate::query_builder::{PageRequest, QueryBuilder, QueryDescriptor};

/// Lifecycle phase of one entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// Not mounted yet.
    Idle,
    /// Fresh query in flight; full-screen spinner.
    Loading,
    /// Next page in flight; existing rows stay visible.
    LoadingMore,
    /// Pull-to-refresh in flight.
    Refreshing,
    /// Last fetch succeeded.
    Ready,
    /// Last fetch failed; rows from earlier fetches are kept.
    Error,
}

/// How a response is merged into the current rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Replace every row.
    Replace,
    /// Append after existing rows.
    Append,
}

/// Fetch issued by the machine and awaiting a response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    /// Monotonic request sequence number.
    pub seq: u64,
    /// Query to send.
    pub query: QueryDescriptor,
    /// Merge mode of the response.
    pub mode: FetchMode,
}

/// Whether a response was applied or discarded as superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response updated the list state.
    Applied,
    /// A newer request was issued, or the list was unmounted.
    Stale,
}

/// Client-held snapshot of one entity's query, rows and status.
#[derive(Debug, Clone)]
pub struct ListState {
    schema: Arc<EntitySchema>,
    rows: Vec<Record>,
    total_count: Option<u64>,
    next_cursor: Option<String>,
    exhausted: bool,
    phase: ListPhase,
    error: Option<AppError>,
    query: QueryDescriptor,
}

impl ListState {
    fn new(schema: Arc<EntitySchema>) -> Self {
        let query = QueryDescriptor::initial(&schema);
        Self {
            schema,
            rows: Vec::new(),
            total_count: None,
            next_cursor: None,
            exhausted: false,
            phase: ListPhase::Idle,
            error: None,
            query,
        }
    }

    /// Returns every fetched row in server order.
    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Returns the rows to display.
    ///
    /// Local-fallback entities are filtered on the client with the current
    /// search text and filters; server-side entities show rows as fetched.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<Record> {
        match self.schema.search_mode() {
            SearchMode::Server => self.rows.clone(),
            SearchMode::LocalFallback => {
                QueryBuilder::apply_local(&self.schema, &self.query, &self.rows)
            }
        }
    }

    /// Returns the server-reported total.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    /// Returns the last applied failure.
    #[must_use]
    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    /// Returns the active query.
    #[must_use]
    pub fn query(&self) -> &QueryDescriptor {
        &self.query
    }

    /// Returns whether a full-screen or load-more fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ListPhase::Loading | ListPhase::LoadingMore)
    }

    /// Returns whether a pull-to-refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.phase == ListPhase::Refreshing
    }

    /// Returns whether every row has been loaded.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the schema the state was built from.
    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }
}

/// Synchronous list state machine.
///
/// `begin_*` methods transition the state and return the fetch to perform;
/// callers report the outcome through `on_fetch_success`/`on_fetch_failure`
/// with the sequence number they were given. Only the latest issued sequence
/// number is ever applied.
#[derive(Debug)]
pub struct ListMachine {
    state: ListState,
    latest_seq: u64,
    pending: Option<PendingFetch>,
    unmounted: bool,
}

impl ListMachine {
    /// Creates an idle machine for one entity.
    #[must_use]
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self {
            state: ListState::new(schema),
            latest_seq: 0,
            pending: None,
            unmounted: false,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// Returns whether a fetch is awaiting its response.
    #[must_use]
    pub fn has_pending_fetch(&self) -> bool {
        self.pending.is_some()
    }

    /// Idle → Loading with the first page.
    pub fn begin_mount(&mut self) -> AppResult<Option<PendingFetch>> {
        if self.unmounted || self.state.phase != ListPhase::Idle {
            return Ok(None);
        }

        let query = self.state.query.clone();
        Ok(Some(self.start_fresh(query, ListPhase::Loading)))
    }

    /// Replaces the search text and restarts from the first page.
    pub fn begin_set_search(&mut self, search_text: Option<&str>) -> AppResult<Option<PendingFetch>> {
        let filters = self.state.query.active_filters.clone();
        self.begin_query(search_text.map(str::to_owned), filters)
    }

    /// Sets or clears one filter and restarts from the first page.
    ///
    /// Unknown keys and ill-typed values fail without touching the state.
    pub fn begin_set_filter(
        &mut self,
        key: &str,
        value: Option<FilterValue>,
    ) -> AppResult<Option<PendingFetch>> {
        let mut filters = self.state.query.active_filters.clone();
        match value {
            Some(value) => {
                QueryBuilder::validate_filter(&self.state.schema, key, &value)?;
                filters.insert(key.to_owned(), value);
            }
            None => {
                if self.state.schema.filter(key).is_none() {
                    return Err(AppError::Validation(format!(
                        "unknown filter '{key}' for entity '{}'",
                        self.state.schema.entity_id()
                    )));
                }
                filters.remove(key);
            }
        }

        let search_text = self.state.query.search_text.clone();
        self.begin_query(search_text, filters)
    }

    /// Drops every filter and restarts from the first page.
    pub fn begin_clear_filters(&mut self) -> AppResult<Option<PendingFetch>> {
        let search_text = self.state.query.search_text.clone();
        self.begin_query(search_text, BTreeMap::new())
    }

    /// Re-runs the active query from the first page.
    pub fn begin_refresh(&mut self) -> Option<PendingFetch> {
        if self.unmounted || self.state.phase == ListPhase::Idle {
            return None;
        }

        let mut query = self.state.query.clone();
        query.page = PageRequest::first();
        Some(self.start_fresh(query, ListPhase::Refreshing))
    }

    /// Requests the next page, unless everything is loaded or a fetch is in flight.
    pub fn begin_load_more(&mut self) -> Option<PendingFetch> {
        if self.unmounted
            || self.pending.is_some()
            || self.state.phase != ListPhase::Ready
            || self.state.exhausted
        {
            return None;
        }

        let mut query = self.state.query.clone();
        query.page = query.page.next(self.state.next_cursor.clone());
        self.state.phase = ListPhase::LoadingMore;
        Some(self.issue(query, FetchMode::Append))
    }

    /// Applies a successful response.
    pub fn on_fetch_success(&mut self, seq: u64, page: ListPage) -> FetchOutcome {
        let Some(pending) = self.take_pending(seq) else {
            return FetchOutcome::Stale;
        };

        let received = page.rows.len();
        match pending.mode {
            FetchMode::Replace => {
                self.state.rows = page.rows;
                self.state.total_count = page.total_count;
            }
            FetchMode::Append => {
                self.state.rows.extend(page.rows);
                self.state.total_count = page.total_count.or(self.state.total_count);
            }
        }

        self.state.query = pending.query;
        self.state.next_cursor = page.next_cursor;
        self.state.exhausted = self.compute_exhausted(received);
        self.state.phase = ListPhase::Ready;
        self.state.error = None;
        FetchOutcome::Applied
    }

    /// Applies a failed response. Previously fetched rows are kept.
    pub fn on_fetch_failure(&mut self, seq: u64, error: AppError) -> FetchOutcome {
        if self.take_pending(seq).is_none() {
            return FetchOutcome::Stale;
        }

        self.state.phase = ListPhase::Error;
        self.state.error = Some(error);
        FetchOutcome::Applied
    }

    /// Abandons the list; any outstanding response is ignored.
    pub fn unmount(&mut self) {
        self.unmounted = true;
        self.pending = None;
        self.latest_seq = self.latest_seq.saturating_add(1);
    }

    /// Returns whether the list was unmounted.
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    fn begin_query(
        &mut self,
        search_text: Option<String>,
        filters: BTreeMap<String, FilterValue>,
    ) -> AppResult<Option<PendingFetch>> {
        if self.unmounted {
            return Ok(None);
        }

        let query = QueryBuilder::build(
            &self.state.schema,
            search_text.as_deref(),
            &filters,
            PageRequest::first(),
        )?;
        self.state.query = query.clone();
        Ok(Some(self.start_fresh(query, ListPhase::Loading)))
    }

    fn start_fresh(&mut self, query: QueryDescriptor, phase: ListPhase) -> PendingFetch {
        self.state.phase = phase;
        self.issue(query, FetchMode::Replace)
    }

    fn issue(&mut self, query: QueryDescriptor, mode: FetchMode) -> PendingFetch {
        self.latest_seq = self.latest_seq.saturating_add(1);
        let pending = PendingFetch {
            seq: self.latest_seq,
            query,
            mode,
        };
        self.pending = Some(pending.clone());
        pending
    }

    fn take_pending(&mut self, seq: u64) -> Option<PendingFetch> {
        if self.unmounted || seq != self.latest_seq {
            return None;
        }

        self.pending.take().filter(|pending| pending.seq == seq)
    }

    fn compute_exhausted(&self, received: usize) -> bool {
        if let Some(total) = self.state.total_count {
            return self.state.rows.len() as u64 >= total;
        }

        match self.state.schema.pagination() {
            PaginationScheme::Cursor { .. } => self.state.next_cursor.is_none(),
            PaginationScheme::Unpaged => true,
            PaginationScheme::PageLimit { .. } | PaginationScheme::OffsetLimit { .. } => {
                received < self.state.query.page_size
            }
        }
    }
}
