use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use sppg_application::{
    EntityGateway, ListPage, ListRequest, LookupRequest, MutationMethod, MutationRequest,
};
use sppg_core::{AppError, AppResult, BearerToken};
use sppg_domain::Record;
use tracing::debug;
use url::Url;

mod envelope;

use envelope::{classify_response, decode_page, decode_record};

/// REST gateway speaking the dashboard API envelope over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEntityGateway {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpEntityGateway {
    /// Creates a gateway rooted at `base_url`.
    ///
    /// The client's configured timeout surfaces as [`AppError::Timeout`].
    pub fn new(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|error| {
            AppError::Config(format!("invalid API base URL '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "API base URL '{base_url}' cannot carry paths"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Joins `path` and an optional record id onto the base URL.
    fn endpoint_url(
        &self,
        path: &str,
        record_id: Option<&str>,
        query: &[(String, String)],
    ) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::Config(format!("API base URL '{}' cannot carry paths", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
            if let Some(record_id) = record_id {
                segments.push(record_id);
            }
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        url: Url,
        token: &BearerToken,
        body: Option<&Value>,
    ) -> AppResult<Value> {
        let mut builder = self
            .http_client
            .request(method.clone(), url.clone())
            .header(header::AUTHORIZATION, token.header_value())
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        debug!(
            method = %method,
            path = url.path(),
            status,
            "entity API responded"
        );
        classify_response(status, &text)
    }
}

#[async_trait]
impl EntityGateway for HttpEntityGateway {
    async fn fetch_page(&self, request: ListRequest) -> AppResult<ListPage> {
        let url = self.endpoint_url(&request.path, None, &request.query)?;
        let envelope = self
            .execute(reqwest::Method::GET, url, &request.token, None)
            .await?;
        decode_page(envelope)
    }

    async fn send_mutation(&self, request: MutationRequest) -> AppResult<Option<Record>> {
        let url = self.endpoint_url(&request.path, request.record_id.as_deref(), &[])?;
        let method = match request.method {
            MutationMethod::Post => reqwest::Method::POST,
            MutationMethod::Put => reqwest::Method::PUT,
            MutationMethod::Patch => reqwest::Method::PATCH,
            MutationMethod::Delete => reqwest::Method::DELETE,
        };

        let envelope = self
            .execute(method, url, &request.token, request.body.as_ref())
            .await?;
        Ok(decode_record(envelope))
    }

    async fn fetch_lookup(&self, request: LookupRequest) -> AppResult<Vec<Record>> {
        let url = self.endpoint_url(&request.path, None, &[])?;
        let envelope = self
            .execute(reqwest::Method::GET, url, &request.token, None)
            .await?;
        Ok(decode_page(envelope)?.rows)
    }
}

fn transport_error(error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Timeout(format!("entity API request timed out: {error}"))
    } else if error.is_decode() {
        AppError::Network(format!("failed to read entity API response: {error}"))
    } else {
        AppError::Network(format!("entity API request failed: {error}"))
    }
}
