use std::collections::BTreeMap;

use serde_json::Value;
use sppg_core::{AppError, AppResult};
use sppg_domain::{
    EntitySchema, FilterKind, FilterValue, PaginationScheme, Record, SearchMode, matching,
};

const SEARCH_PARAM: &str = "search";

/// Requested page position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Cursor returned by the previous page, for cursor pagination.
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Returns the first page.
    #[must_use]
    pub fn first() -> Self {
        Self {
            page: 1,
            cursor: None,
        }
    }

    /// Returns the page following this one.
    #[must_use]
    pub fn next(&self, cursor: Option<String>) -> Self {
        Self {
            page: self.page.saturating_add(1),
            cursor,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Normalized list request for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Entity being listed.
    pub entity_id: String,
    /// Free-text search, forwarded verbatim.
    pub search_text: Option<String>,
    /// Active filters keyed by filter key.
    pub active_filters: BTreeMap<String, FilterValue>,
    /// Page position.
    pub page: PageRequest,
    /// Rows per page.
    pub page_size: usize,
}

impl QueryDescriptor {
    /// Returns the first-page query without search or filters.
    #[must_use]
    pub fn initial(schema: &EntitySchema) -> Self {
        Self {
            entity_id: schema.entity_id().to_owned(),
            search_text: None,
            active_filters: BTreeMap::new(),
            page: PageRequest::first(),
            page_size: schema.page_size(),
        }
    }
}

/// Builds and serializes list queries against an entity schema.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Builds a validated query descriptor.
    ///
    /// Blank search text is dropped; anything else is forwarded unchanged.
    pub fn build(
        schema: &EntitySchema,
        search_text: Option<&str>,
        active_filters: &BTreeMap<String, FilterValue>,
        page: PageRequest,
    ) -> AppResult<QueryDescriptor> {
        if page.page == 0 {
            return Err(AppError::Validation(
                "page numbers start at 1".to_owned(),
            ));
        }

        for (key, value) in active_filters {
            Self::validate_filter(schema, key, value)?;
        }

        Ok(QueryDescriptor {
            entity_id: schema.entity_id().to_owned(),
            search_text: search_text
                .filter(|text| !text.trim().is_empty())
                .map(str::to_owned),
            active_filters: active_filters.clone(),
            page,
            page_size: schema.page_size(),
        })
    }

    /// Checks that `key` is declared by the schema and `value` fits its kind.
    pub fn validate_filter(schema: &EntitySchema, key: &str, value: &FilterValue) -> AppResult<()> {
        let Some(spec) = schema.filter(key) else {
            return Err(AppError::Validation(format!(
                "unknown filter '{key}' for entity '{}'",
                schema.entity_id()
            )));
        };

        let is_valid = match (spec.kind(), value) {
            (FilterKind::Boolean, FilterValue::Exact { value }) => value.is_boolean(),
            (FilterKind::Select, FilterValue::Exact { value }) => {
                value.is_string() || value.is_number() || value.is_boolean()
            }
            (FilterKind::Search, FilterValue::Exact { value }) => value.is_string(),
            (FilterKind::Number, FilterValue::Exact { value }) => value.is_number(),
            (FilterKind::Number, FilterValue::Range { from, to }) => {
                (from.is_some() || to.is_some())
                    && [from, to].into_iter().flatten().all(Value::is_number)
            }
            (FilterKind::DateRange, FilterValue::Range { from, to }) => {
                (from.is_some() || to.is_some())
                    && [from, to].into_iter().flatten().all(Value::is_string)
            }
            _ => false,
        };

        if !is_valid {
            return Err(AppError::Validation(format!(
                "invalid value for {} filter '{key}'",
                spec.kind().as_str()
            )));
        }

        Ok(())
    }

    /// Serializes a descriptor into query parameters for the list endpoint.
    ///
    /// Search and filters are omitted for local-fallback entities.
    #[must_use]
    pub fn to_query_pairs(
        schema: &EntitySchema,
        descriptor: &QueryDescriptor,
    ) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if schema.search_mode() == SearchMode::Server {
            if let Some(search_text) = &descriptor.search_text {
                pairs.push((SEARCH_PARAM.to_owned(), search_text.clone()));
            }

            for (key, value) in &descriptor.active_filters {
                match value {
                    FilterValue::Exact { value } => {
                        pairs.push((key.clone(), transport_value(value)));
                    }
                    FilterValue::Range { from, to } => {
                        if let Some(from) = from {
                            pairs.push((format!("{key}_from"), transport_value(from)));
                        }
                        if let Some(to) = to {
                            pairs.push((format!("{key}_to"), transport_value(to)));
                        }
                    }
                }
            }
        }

        let page_size = descriptor.page_size.to_string();
        match schema.pagination() {
            PaginationScheme::PageLimit {
                page_param,
                limit_param,
            } => {
                pairs.push((page_param.clone(), descriptor.page.page.to_string()));
                pairs.push((limit_param.clone(), page_size));
            }
            PaginationScheme::OffsetLimit {
                offset_param,
                limit_param,
            } => {
                let offset =
                    (descriptor.page.page.saturating_sub(1) as usize).saturating_mul(descriptor.page_size);
                pairs.push((offset_param.clone(), offset.to_string()));
                pairs.push((limit_param.clone(), page_size));
            }
            PaginationScheme::Cursor {
                cursor_param,
                limit_param,
            } => {
                if let Some(cursor) = &descriptor.page.cursor {
                    pairs.push((cursor_param.clone(), cursor.clone()));
                }
                pairs.push((limit_param.clone(), page_size));
            }
            PaginationScheme::Unpaged => {}
        }

        pairs
    }

    /// Applies search and filters on the client, preserving row order.
    #[must_use]
    pub fn apply_local(
        schema: &EntitySchema,
        descriptor: &QueryDescriptor,
        rows: &[Record],
    ) -> Vec<Record> {
        matching::apply_local_query(
            schema,
            rows,
            descriptor.search_text.as_deref(),
            &descriptor.active_filters,
        )
    }
}

fn transport_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
