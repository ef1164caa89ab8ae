use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use sppg_application::{
    EntityGateway, ListPage, ListRequest, LookupRequest, MutationMethod, MutationRequest,
    TableRegistry,
};
use sppg_core::{AppError, AppResult, BearerToken};
use sppg_domain::{EntitySchema, FilterKind, FilterValue, PaginationScheme, Record, matching};
use tokio::sync::RwLock;
use tracing::debug;

const SEARCH_PARAM: &str = "search";

/// Gateway serving seeded rows with server-side search, filters and paging.
#[derive(Debug)]
pub struct InMemoryEntityGateway {
    registry: TableRegistry,
    tables: RwLock<HashMap<String, Vec<Record>>>,
    lookups: RwLock<HashMap<String, Vec<Record>>>,
    required_token: Option<String>,
}

impl InMemoryEntityGateway {
    /// Creates an empty gateway answering for every entity in `registry`.
    #[must_use]
    pub fn new(registry: TableRegistry) -> Self {
        Self {
            registry,
            tables: RwLock::new(HashMap::new()),
            lookups: RwLock::new(HashMap::new()),
            required_token: None,
        }
    }

    /// Rejects requests whose bearer token differs from `token`.
    #[must_use]
    pub fn with_required_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// Replaces the rows of one entity.
    pub async fn seed(&self, entity_id: &str, rows: Vec<Record>) {
        self.tables.write().await.insert(entity_id.to_owned(), rows);
    }

    /// Registers rows served by a lookup path.
    pub async fn seed_lookup(&self, path: &str, rows: Vec<Record>) {
        self.lookups.write().await.insert(path.to_owned(), rows);
    }

    /// Returns the stored rows of one entity.
    pub async fn rows(&self, entity_id: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(entity_id)
            .cloned()
            .unwrap_or_default()
    }

    fn authorize(&self, token: &BearerToken) -> AppResult<()> {
        match &self.required_token {
            Some(expected) if expected != token.as_str() => Err(AppError::Unauthorized {
                status: Some(401),
                message: None,
            }),
            _ => Ok(()),
        }
    }

    fn schema_for(&self, entity_id: &str) -> AppResult<std::sync::Arc<EntitySchema>> {
        self.registry
            .find(entity_id)
            .ok_or_else(|| not_found(format!("unknown entity '{entity_id}'")))
    }
}

#[async_trait]
impl EntityGateway for InMemoryEntityGateway {
    async fn fetch_page(&self, request: ListRequest) -> AppResult<ListPage> {
        self.authorize(&request.token)?;
        let schema = self.schema_for(&request.entity_id)?;
        if !schema
            .list_endpoints()
            .iter()
            .any(|strategy| strategy.path() == request.path)
        {
            return Err(not_found(format!("no list endpoint at '{}'", request.path)));
        }

        let params: HashMap<&str, &str> = request
            .query
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let filters = parse_filters(&schema, &params)?;
        let rows = self.rows(&request.entity_id).await;
        let matched = matching::apply_local_query(
            &schema,
            &rows,
            params.get(SEARCH_PARAM).copied(),
            &filters,
        );

        let page = paginate(&schema, &params, matched)?;
        debug!(
            entity_id = %request.entity_id,
            path = %request.path,
            returned = page.rows.len(),
            total = page.total_count,
            "served in-memory list page"
        );
        Ok(page)
    }

    async fn send_mutation(&self, request: MutationRequest) -> AppResult<Option<Record>> {
        self.authorize(&request.token)?;
        let schema = self.schema_for(&request.entity_id)?;
        if request.path != schema.resource_path() {
            return Err(not_found(format!("no resource at '{}'", request.path)));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(request.entity_id.clone()).or_default();

        match request.method {
            MutationMethod::Post => {
                let mut record = Record::new(body_fields(request.body)?);
                if record.id().is_none() {
                    record.insert("id", Value::from(next_id(rows)));
                }
                rows.push(record.clone());
                Ok(Some(record))
            }
            MutationMethod::Put | MutationMethod::Patch => {
                let record_id = request.record_id.as_deref().unwrap_or_default();
                let position = find_row(rows, record_id)?;
                let existing_id = rows[position].get("id").cloned();
                let fields = body_fields(request.body)?;

                let mut record = if request.method == MutationMethod::Put {
                    Record::new(fields)
                } else {
                    let mut merged = rows[position].clone();
                    for (key, value) in fields {
                        merged.insert(key, value);
                    }
                    merged
                };
                if let Some(id) = existing_id {
                    record.insert("id", id);
                }

                rows[position] = record.clone();
                Ok(Some(record))
            }
            MutationMethod::Delete => {
                let record_id = request.record_id.as_deref().unwrap_or_default();
                let position = find_row(rows, record_id)?;
                rows.remove(position);
                Ok(None)
            }
        }
    }

    async fn fetch_lookup(&self, request: LookupRequest) -> AppResult<Vec<Record>> {
        self.authorize(&request.token)?;
        if let Some(rows) = self.lookups.read().await.get(&request.path) {
            return Ok(rows.clone());
        }

        let entity = self
            .registry
            .list()
            .into_iter()
            .find(|schema| schema.resource_path() == request.path)
            .ok_or_else(|| not_found(format!("unknown lookup '{}'", request.lookup)))?;
        Ok(self.rows(entity.entity_id()).await)
    }
}

fn parse_filters(
    schema: &EntitySchema,
    params: &HashMap<&str, &str>,
) -> AppResult<BTreeMap<String, FilterValue>> {
    let mut filters = BTreeMap::new();

    for spec in schema.filters() {
        let key = spec.key();
        match spec.kind() {
            FilterKind::DateRange | FilterKind::Number => {
                let from = params.get(format!("{key}_from").as_str()).copied();
                let to = params.get(format!("{key}_to").as_str()).copied();
                if from.is_some() || to.is_some() {
                    let from = from.map(|raw| param_value(spec.kind(), raw)).transpose()?;
                    let to = to.map(|raw| param_value(spec.kind(), raw)).transpose()?;
                    filters.insert(key.to_owned(), FilterValue::range(from, to));
                    continue;
                }
            }
            FilterKind::Select | FilterKind::Boolean | FilterKind::Search => {}
        }

        if let Some(raw) = params.get(key) {
            filters.insert(
                key.to_owned(),
                FilterValue::exact(param_value(spec.kind(), raw)?),
            );
        }
    }

    Ok(filters)
}

fn param_value(kind: FilterKind, raw: &str) -> AppResult<Value> {
    let invalid = || AppError::Server {
        status: Some(400),
        message: Some(format!("invalid {} filter value '{raw}'", kind.as_str())),
    };

    match kind {
        FilterKind::Boolean => raw.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
        FilterKind::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FilterKind::Select => Ok(match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
            _ => Value::String(raw.to_owned()),
        }),
        FilterKind::DateRange | FilterKind::Search => Ok(Value::String(raw.to_owned())),
    }
}

fn paginate(
    schema: &EntitySchema,
    params: &HashMap<&str, &str>,
    rows: Vec<Record>,
) -> AppResult<ListPage> {
    let total = rows.len();
    let numeric = |name: &str, default: usize| -> AppResult<usize> {
        params.get(name).map_or(Ok(default), |raw| {
            raw.parse::<usize>().map_err(|_| AppError::Server {
                status: Some(400),
                message: Some(format!("invalid {name} parameter '{raw}'")),
            })
        })
    };

    let (start, limit, cursor_paged) = match schema.pagination() {
        PaginationScheme::PageLimit {
            page_param,
            limit_param,
        } => {
            let page = numeric(page_param.as_str(), 1)?.max(1);
            let limit = numeric(limit_param.as_str(), schema.page_size())?;
            ((page - 1).saturating_mul(limit), limit, false)
        }
        PaginationScheme::OffsetLimit {
            offset_param,
            limit_param,
        } => (
            numeric(offset_param.as_str(), 0)?,
            numeric(limit_param.as_str(), schema.page_size())?,
            false,
        ),
        PaginationScheme::Cursor {
            cursor_param,
            limit_param,
        } => (
            numeric(cursor_param.as_str(), 0)?,
            numeric(limit_param.as_str(), schema.page_size())?,
            true,
        ),
        PaginationScheme::Unpaged => (0, total, false),
    };

    let end = start.saturating_add(limit).min(total);
    let page_rows: Vec<Record> = rows.into_iter().skip(start).take(limit).collect();

    Ok(ListPage {
        rows: page_rows,
        total_count: (!cursor_paged).then_some(total as u64),
        next_cursor: (cursor_paged && end < total).then(|| end.to_string()),
    })
}

fn body_fields(body: Option<Value>) -> AppResult<Map<String, Value>> {
    match body {
        Some(Value::Object(fields)) => Ok(fields),
        _ => Err(AppError::Server {
            status: Some(400),
            message: Some("request body must be a JSON object".to_owned()),
        }),
    }
}

fn find_row(rows: &[Record], record_id: &str) -> AppResult<usize> {
    rows.iter()
        .position(|row| row.id().as_deref() == Some(record_id))
        .ok_or_else(|| not_found(format!("record '{record_id}' not found")))
}

fn next_id(rows: &[Record]) -> u64 {
    rows.iter()
        .filter_map(|row| row.id()?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

fn not_found(message: String) -> AppError {
    AppError::Server {
        status: Some(404),
        message: Some(message),
    }
}
