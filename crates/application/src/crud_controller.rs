use std::sync::Arc;

use serde_json::{Map, Value};
use sppg_core::{AppError, AppResult};
use sppg_domain::{EntityAction, EntitySchema, Record, UpdateMethod};
use tracing::{info, warn};

use crate::gateway_ports::{
    EntityGateway, MutationMethod, MutationRequest, TokenProvider, require_token,
};
use crate::list_controller::ListController;

/// Outcome of required-field validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    missing_fields: Vec<String>,
}

impl ValidationResult {
    /// Returns whether every required field is present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_fields.is_empty()
    }

    /// Returns every missing required field in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> &[String] {
        &self.missing_fields
    }

    /// Converts a failed validation into a validation error naming all fields.
    pub fn into_result(self) -> AppResult<()> {
        if self.is_valid() {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "missing required fields: {}",
            self.missing_fields.join(", ")
        )))
    }
}

/// Create/update/delete flow for one entity.
pub struct CrudController {
    schema: Arc<EntitySchema>,
    gateway: Arc<dyn EntityGateway>,
    token_provider: Arc<dyn TokenProvider>,
    list: Option<Arc<ListController>>,
}

impl CrudController {
    /// Creates a controller without an attached list.
    #[must_use]
    pub fn new(
        schema: Arc<EntitySchema>,
        gateway: Arc<dyn EntityGateway>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            schema,
            gateway,
            token_provider,
            list: None,
        }
    }

    /// Attaches the list refreshed after each successful mutation.
    #[must_use]
    pub fn with_list_controller(mut self, list: Arc<ListController>) -> Self {
        self.list = Some(list);
        self
    }

    /// Checks `required_fields` against submitted values.
    ///
    /// Absent, `null`, blank-string and empty-array values count as missing.
    #[must_use]
    pub fn validate(form_values: &Map<String, Value>, required_fields: &[&str]) -> ValidationResult {
        let missing_fields = required_fields
            .iter()
            .filter(|field| is_missing(form_values.get(**field)))
            .map(|field| (*field).to_owned())
            .collect();

        ValidationResult { missing_fields }
    }

    /// Creates a record, or updates `existing_id` when given.
    ///
    /// PATCH updates only check the required fields they submit. Validation
    /// failures never reach the network. On success the attached list is
    /// refreshed; a failed refresh is logged and does not fail the submit.
    pub async fn submit(
        &self,
        form_values: Map<String, Value>,
        existing_id: Option<&str>,
    ) -> AppResult<Record> {
        self.require_action(EntityAction::Edit)?;
        if existing_id.is_some_and(|id| id.trim().is_empty()) {
            return Err(AppError::Validation("record id must not be empty".to_owned()));
        }

        let method = match (existing_id, self.schema.update_method()) {
            (None, _) => MutationMethod::Post,
            (Some(_), UpdateMethod::Put) => MutationMethod::Put,
            (Some(_), UpdateMethod::Patch) => MutationMethod::Patch,
        };
        let mut required_fields = self.schema.required_fields();
        if method == MutationMethod::Patch {
            required_fields.retain(|field| form_values.contains_key(*field));
        }
        Self::validate(&form_values, &required_fields).into_result()?;

        let token = require_token(self.token_provider.as_ref()).await?;

        let request = MutationRequest {
            entity_id: self.schema.entity_id().to_owned(),
            path: self.schema.resource_path().to_owned(),
            record_id: existing_id.map(str::to_owned),
            method,
            body: Some(Value::Object(form_values.clone())),
            token,
        };

        let echoed = self.gateway.send_mutation(request).await.inspect_err(|error| {
            warn!(
                entity_id = %self.schema.entity_id(),
                method = method.as_str(),
                error = %error,
                "entity submit failed"
            );
        })?;

        let record = echoed.unwrap_or_else(|| {
            let mut record = Record::new(form_values);
            if let Some(id) = existing_id {
                record.insert("id", Value::String(id.to_owned()));
            }
            record
        });

        info!(
            entity_id = %self.schema.entity_id(),
            method = method.as_str(),
            record_id = record.id().as_deref().unwrap_or("-"),
            "entity submitted"
        );

        self.refresh_list().await;
        Ok(record)
    }

    /// Deletes one record. Rows stay in the list until the server confirms.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.require_action(EntityAction::Delete)?;
        if id.trim().is_empty() {
            return Err(AppError::Validation("record id must not be empty".to_owned()));
        }

        let token = require_token(self.token_provider.as_ref()).await?;
        let request = MutationRequest {
            entity_id: self.schema.entity_id().to_owned(),
            path: self.schema.resource_path().to_owned(),
            record_id: Some(id.to_owned()),
            method: MutationMethod::Delete,
            body: None,
            token,
        };

        self.gateway.send_mutation(request).await.inspect_err(|error| {
            warn!(
                entity_id = %self.schema.entity_id(),
                record_id = id,
                error = %error,
                "entity delete failed"
            );
        })?;

        info!(entity_id = %self.schema.entity_id(), record_id = id, "entity deleted");
        self.refresh_list().await;
        Ok(())
    }

    fn require_action(&self, action: EntityAction) -> AppResult<()> {
        if self.schema.allows(action) {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "entity '{}' does not allow {action:?}",
            self.schema.entity_id()
        )))
    }

    async fn refresh_list(&self) {
        let Some(list) = &self.list else {
            return;
        };

        if let Err(error) = list.refresh().await {
            warn!(
                entity_id = %self.schema.entity_id(),
                error = %error,
                "list refresh after mutation failed"
            );
        }
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
