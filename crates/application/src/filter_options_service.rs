use std::sync::Arc;

use serde_json::Value;
use sppg_core::AppResult;
use sppg_domain::{DynamicOptionsSource, EntitySchema, FilterOption, FilterSpec};
use tracing::debug;

use crate::gateway_ports::{EntityGateway, LookupRequest, TokenProvider, require_token};

/// Resolves filter options that are loaded from lookup endpoints.
pub struct FilterOptionsService {
    gateway: Arc<dyn EntityGateway>,
    token_provider: Arc<dyn TokenProvider>,
}

impl FilterOptionsService {
    /// Creates a new service.
    #[must_use]
    pub fn new(gateway: Arc<dyn EntityGateway>, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            gateway,
            token_provider,
        }
    }

    /// Returns the schema filters with every dynamic source resolved to static options.
    pub async fn resolve_filters(&self, schema: &EntitySchema) -> AppResult<Vec<FilterSpec>> {
        let mut resolved = Vec::with_capacity(schema.filters().len());
        for filter in schema.filters() {
            match filter.dynamic_source() {
                Some(source) => {
                    let options = self.resolve_options(source).await?;
                    resolved.push(filter.with_resolved_options(options));
                }
                None => resolved.push(filter.clone()),
            }
        }

        Ok(resolved)
    }

    /// Loads one lookup and maps its rows to options.
    ///
    /// Rows without a usable value are skipped; repeated values keep their
    /// first label.
    pub async fn resolve_options(
        &self,
        source: &DynamicOptionsSource,
    ) -> AppResult<Vec<FilterOption>> {
        let token = require_token(self.token_provider.as_ref()).await?;
        let rows = self
            .gateway
            .fetch_lookup(LookupRequest {
                lookup: source.lookup().to_owned(),
                path: source.path().to_owned(),
                token,
            })
            .await?;

        let mut options: Vec<FilterOption> = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(value) = row
                .get_path(source.value_field())
                .filter(|value| is_option_value(value))
            else {
                continue;
            };
            if options.iter().any(|option| option.value() == value) {
                continue;
            }

            let label = match row.get_path(source.label_field()) {
                Some(Value::String(label)) if !label.trim().is_empty() => label.clone(),
                Some(Value::Number(label)) => label.to_string(),
                _ => option_label(value),
            };
            options.push(FilterOption::new(value.clone(), label));
        }

        debug!(
            lookup = source.lookup(),
            rows = rows.len(),
            options = options.len(),
            "resolved dynamic filter options"
        );
        Ok(options)
    }
}

fn is_option_value(value: &Value) -> bool {
    match value {
        Value::String(text) => !text.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        _ => false,
    }
}

fn option_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
