use async_trait::async_trait;
use serde_json::Value;
use sppg_core::{AppResult, BearerToken};
use sppg_domain::Record;

/// Source of the bearer credential attached to every request.
///
/// Implementations may be called concurrently and must serialize their own
/// token refresh.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current access token, or `None` when signed out.
    async fn get_token(&self) -> Option<String>;
}

/// Resolves a credential, short-circuiting with an auth error when absent.
pub async fn require_token(provider: &dyn TokenProvider) -> AppResult<BearerToken> {
    let token = provider.get_token().await.unwrap_or_default();
    BearerToken::new(token)
}

/// One list request ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Entity being listed.
    pub entity_id: String,
    /// Endpoint path relative to the API base URL.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Bearer credential.
    pub token: BearerToken,
}

/// One decoded page of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    /// Rows in server order.
    pub rows: Vec<Record>,
    /// Total matching rows when the server reports it.
    pub total_count: Option<u64>,
    /// Cursor of the next page for cursor pagination.
    pub next_cursor: Option<String>,
}

/// HTTP method of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMethod {
    /// Create.
    Post,
    /// Full update.
    Put,
    /// Partial update.
    Patch,
    /// Removal.
    Delete,
}

impl MutationMethod {
    /// Returns the HTTP method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// One create/update/delete request ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    /// Entity being mutated.
    pub entity_id: String,
    /// Collection path relative to the API base URL.
    pub path: String,
    /// Target record for update and delete.
    pub record_id: Option<String>,
    /// HTTP method.
    pub method: MutationMethod,
    /// JSON body for create and update.
    pub body: Option<Value>,
    /// Bearer credential.
    pub token: BearerToken,
}

/// Request for the rows backing dynamic filter options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// Lookup identifier, for logs.
    pub lookup: String,
    /// Endpoint path relative to the API base URL.
    pub path: String,
    /// Bearer credential.
    pub token: BearerToken,
}

/// Remote REST API collaborator.
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Fetches one page of rows.
    async fn fetch_page(&self, request: ListRequest) -> AppResult<ListPage>;

    /// Sends a mutation and returns the record echoed by the server, if any.
    async fn send_mutation(&self, request: MutationRequest) -> AppResult<Option<Record>>;

    /// Fetches lookup rows for dynamic filter options.
    async fn fetch_lookup(&self, request: LookupRequest) -> AppResult<Vec<Record>>;
}
