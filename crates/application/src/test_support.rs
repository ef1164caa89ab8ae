use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sppg_core::{AppError, AppResult};
use sppg_domain::Record;
use tokio::sync::{Mutex, Notify};

use crate::{EntityGateway, ListPage, ListRequest, LookupRequest, MutationRequest, TokenProvider};

pub(crate) struct FixedTokenProvider(pub Option<&'static str>);

#[async_trait]
impl TokenProvider for FixedTokenProvider {
    async fn get_token(&self) -> Option<String> {
        self.0.map(str::to_owned)
    }
}

pub(crate) fn signed_in() -> Arc<dyn TokenProvider> {
    Arc::new(FixedTokenProvider(Some("token-admin")))
}

pub(crate) fn record(value: Value) -> Record {
    Record::from_value(value).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn page(rows: Vec<Value>, total_count: Option<u64>) -> ListPage {
    ListPage {
        rows: rows.into_iter().map(record).collect(),
        total_count,
        next_cursor: None,
    }
}

/// Gateway fake replaying queued responses in call order.
#[derive(Default)]
pub(crate) struct FakeGateway {
    list_responses: Mutex<VecDeque<AppResult<ListPage>>>,
    failing_paths: Mutex<HashMap<String, AppError>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub(crate) list_requests: Mutex<Vec<ListRequest>>,
    mutation_responses: Mutex<VecDeque<AppResult<Option<Record>>>>,
    pub(crate) mutation_requests: Mutex<Vec<MutationRequest>>,
    lookups: Mutex<HashMap<String, Vec<Record>>>,
    pub(crate) lookup_requests: Mutex<Vec<LookupRequest>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) async fn push_list(&self, response: AppResult<ListPage>) {
        self.list_responses.lock().await.push_back(response);
    }

    pub(crate) async fn fail_path(&self, path: &str, error: AppError) {
        self.failing_paths
            .lock()
            .await
            .insert(path.to_owned(), error);
    }

    /// Holds back responses of requests carrying `query_value` until notified.
    pub(crate) async fn gate(&self, query_value: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .await
            .insert(query_value.to_owned(), notify.clone());
        notify
    }

    pub(crate) async fn push_mutation(&self, response: AppResult<Option<Record>>) {
        self.mutation_responses.lock().await.push_back(response);
    }

    pub(crate) async fn seed_lookup(&self, path: &str, rows: Vec<Value>) {
        self.lookups
            .lock()
            .await
            .insert(path.to_owned(), rows.into_iter().map(record).collect());
    }
}

#[async_trait]
impl EntityGateway for FakeGateway {
    async fn fetch_page(&self, request: ListRequest) -> AppResult<ListPage> {
        self.list_requests.lock().await.push(request.clone());

        if let Some(error) = self.failing_paths.lock().await.get(&request.path) {
            return Err(error.clone());
        }

        let response = self
            .list_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(ListPage::default()));

        let gate = {
            let gates = self.gates.lock().await;
            request
                .query
                .iter()
                .find_map(|(_, value)| gates.get(value).cloned())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        response
    }

    async fn send_mutation(&self, request: MutationRequest) -> AppResult<Option<Record>> {
        self.mutation_requests.lock().await.push(request);
        self.mutation_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn fetch_lookup(&self, request: LookupRequest) -> AppResult<Vec<Record>> {
        let rows = self.lookups.lock().await.get(&request.path).cloned();
        self.lookup_requests.lock().await.push(request.clone());
        rows.ok_or_else(|| AppError::Server {
            status: Some(404),
            message: Some(format!("lookup '{}' not found", request.lookup)),
        })
    }
}
