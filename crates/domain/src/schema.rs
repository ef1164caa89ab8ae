use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use sppg_core::{AppError, AppResult, NonEmptyString};

use crate::column::ColumnSpec;
use crate::filter::FilterSpec;

const DEFAULT_PAGE_SIZE: usize = 20;

/// Action a user may perform on rows of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityAction {
    /// Open the row detail.
    View,
    /// Create or update rows.
    Edit,
    /// Delete rows.
    Delete,
    /// Export the table.
    Export,
}

/// Where search and filters are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// The backend applies search and filter query parameters.
    #[default]
    Server,
    /// The backend lacks search support; rows are filtered on the client.
    LocalFallback,
}

/// HTTP method used for updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// Full replacement.
    #[default]
    Put,
    /// Partial update.
    Patch,
}

/// Pagination parameters expected by a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum PaginationScheme {
    /// 1-based page number plus page size.
    PageLimit {
        /// Page number parameter name.
        page_param: String,
        /// Page size parameter name.
        limit_param: String,
    },
    /// Row offset plus page size.
    OffsetLimit {
        /// Offset parameter name.
        offset_param: String,
        /// Page size parameter name.
        limit_param: String,
    },
    /// Opaque cursor returned by the previous page.
    Cursor {
        /// Cursor parameter name.
        cursor_param: String,
        /// Page size parameter name.
        limit_param: String,
    },
    /// The endpoint returns every row at once.
    Unpaged,
}

impl Default for PaginationScheme {
    fn default() -> Self {
        Self::PageLimit {
            page_param: "page".to_owned(),
            limit_param: "limit".to_owned(),
        }
    }
}

/// One candidate list endpoint; candidates are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStrategy {
    name: NonEmptyString,
    path: NonEmptyString,
}

impl EndpointStrategy {
    /// Creates an endpoint strategy.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> AppResult<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(AppError::Config(format!(
                "endpoint path '{path}' must start with '/'"
            )));
        }

        Ok(Self {
            name: NonEmptyString::new(name)
                .map_err(|error| AppError::Config(error.to_string()))?,
            path: NonEmptyString::new(path)
                .map_err(|error| AppError::Config(error.to_string()))?,
        })
    }

    /// Returns the strategy name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the endpoint path relative to the API base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

/// Input kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormInputKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    TextArea,
    /// Numeric input.
    Number,
    /// Email input.
    Email,
    /// Masked password input.
    Password,
    /// Option picker.
    Select,
    /// Date picker.
    Date,
    /// On/off switch.
    Toggle,
}

/// Field of the add/edit form bound to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldSpec {
    key: NonEmptyString,
    label: String,
    input: FormInputKind,
    required: bool,
}

impl FormFieldSpec {
    /// Creates a form field.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        input: FormInputKind,
        required: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            key: NonEmptyString::new(key).map_err(|error| AppError::Config(error.to_string()))?,
            label: label.into(),
            input,
            required,
        })
    }

    /// Returns the submitted property name.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the field label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the input kind.
    #[must_use]
    pub fn input(&self) -> FormInputKind {
        self.input
    }

    /// Returns whether the field must be filled.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Construction input for [`EntitySchema`].
#[derive(Debug, Clone)]
pub struct EntitySchemaInput {
    /// Unique entity identifier, e.g. `schools`.
    pub entity_id: String,
    /// Human-friendly entity name.
    pub display_name: String,
    /// Collection path for create/update/delete.
    pub resource_path: String,
    /// Ordered list endpoints. Empty means `resource_path` alone.
    pub list_endpoints: Vec<EndpointStrategy>,
    /// Fields eligible for free-text search.
    pub searchable_fields: Vec<String>,
    /// Display columns in order.
    pub columns: Vec<ColumnSpec>,
    /// Filter definitions in display order.
    pub filters: Vec<FilterSpec>,
    /// Allowed row actions.
    pub allowed_actions: Vec<EntityAction>,
    /// Add/edit form fields.
    pub form_fields: Vec<FormFieldSpec>,
    /// Pagination scheme of the list endpoints.
    pub pagination: PaginationScheme,
    /// Rows requested per page.
    pub page_size: usize,
    /// Where search and filters are evaluated.
    pub search_mode: SearchMode,
    /// Method used for updates.
    pub update_method: UpdateMethod,
}

impl EntitySchemaInput {
    /// Creates an input with defaults for everything but identity and path.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        display_name: impl Into<String>,
        resource_path: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            display_name: display_name.into(),
            resource_path: resource_path.into(),
            list_endpoints: Vec::new(),
            searchable_fields: Vec::new(),
            columns: Vec::new(),
            filters: Vec::new(),
            allowed_actions: vec![EntityAction::View],
            form_fields: Vec::new(),
            pagination: PaginationScheme::default(),
            page_size: DEFAULT_PAGE_SIZE,
            search_mode: SearchMode::default(),
            update_method: UpdateMethod::default(),
        }
    }
}

/// Declarative description of one entity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    entity_id: String,
    display_name: String,
    resource_path: String,
    list_endpoints: Vec<EndpointStrategy>,
    searchable_fields: Vec<String>,
    columns: Vec<ColumnSpec>,
    filters: Vec<FilterSpec>,
    allowed_actions: BTreeSet<EntityAction>,
    form_fields: Vec<FormFieldSpec>,
    pagination: PaginationScheme,
    page_size: usize,
    search_mode: SearchMode,
    update_method: UpdateMethod,
}

impl EntitySchema {
    /// Creates a schema and checks its invariants.
    pub fn new(input: EntitySchemaInput) -> AppResult<Self> {
        let resource_path = input.resource_path.trim_end_matches('/').to_owned();
        let list_endpoints = if input.list_endpoints.is_empty() {
            vec![EndpointStrategy::new("default", resource_path.as_str())?]
        } else {
            input.list_endpoints
        };

        let schema = Self {
            entity_id: input.entity_id,
            display_name: input.display_name,
            resource_path,
            list_endpoints,
            searchable_fields: input.searchable_fields,
            columns: input.columns,
            filters: input.filters,
            allowed_actions: input.allowed_actions.into_iter().collect(),
            form_fields: input.form_fields,
            pagination: input.pagination,
            page_size: input.page_size,
            search_mode: input.search_mode,
            update_method: input.update_method,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Minimal view-only schema served for unregistered entities.
    #[must_use]
    pub fn fallback(entity_id: &str) -> Self {
        let path = format!("/{}", entity_id.trim_matches('/'));
        let list_endpoints = EndpointStrategy::new("default", path.as_str())
            .map(|endpoint| vec![endpoint])
            .unwrap_or_default();

        Self {
            entity_id: entity_id.to_owned(),
            display_name: entity_id.to_owned(),
            resource_path: path,
            list_endpoints,
            searchable_fields: Vec::new(),
            columns: Vec::new(),
            filters: Vec::new(),
            allowed_actions: BTreeSet::from([EntityAction::View]),
            form_fields: Vec::new(),
            pagination: PaginationScheme::default(),
            page_size: DEFAULT_PAGE_SIZE,
            search_mode: SearchMode::default(),
            update_method: UpdateMethod::default(),
        }
    }

    /// Checks every registration invariant. Failures are configuration errors.
    pub fn validate(&self) -> AppResult<()> {
        if self.entity_id.trim().is_empty() {
            return Err(AppError::Config("entity id must not be empty".to_owned()));
        }

        let context = self.entity_id.as_str();
        if self.columns.is_empty() {
            return Err(AppError::Config(format!(
                "entity '{context}' must declare at least one column"
            )));
        }

        let mut seen_columns = HashSet::new();
        for column in &self.columns {
            if !seen_columns.insert(column.key()) {
                return Err(AppError::Config(format!(
                    "entity '{context}' declares column '{}' more than once",
                    column.key()
                )));
            }
        }

        let mut seen_filters = HashSet::new();
        for filter in &self.filters {
            filter.validate()?;
            if !seen_filters.insert(filter.key()) {
                return Err(AppError::Config(format!(
                    "entity '{context}' declares filter '{}' more than once",
                    filter.key()
                )));
            }
        }

        let mut seen_form_fields = HashSet::new();
        for field in &self.form_fields {
            if !seen_form_fields.insert(field.key()) {
                return Err(AppError::Config(format!(
                    "entity '{context}' declares form field '{}' more than once",
                    field.key()
                )));
            }
        }

        if self.searchable_fields.iter().any(|field| field.trim().is_empty()) {
            return Err(AppError::Config(format!(
                "entity '{context}' has an empty searchable field"
            )));
        }

        if self.list_endpoints.is_empty() {
            return Err(AppError::Config(format!(
                "entity '{context}' must declare at least one list endpoint"
            )));
        }

        if !self.resource_path.starts_with('/') {
            return Err(AppError::Config(format!(
                "entity '{context}' resource path must start with '/'"
            )));
        }

        if self.page_size == 0 {
            return Err(AppError::Config(format!(
                "entity '{context}' page size must be greater than zero"
            )));
        }

        Ok(())
    }

    /// Returns the unique entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the mutation collection path.
    #[must_use]
    pub fn resource_path(&self) -> &str {
        self.resource_path.as_str()
    }

    /// Returns list endpoints in try order.
    #[must_use]
    pub fn list_endpoints(&self) -> &[EndpointStrategy] {
        &self.list_endpoints
    }

    /// Returns searchable fields in order.
    #[must_use]
    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    /// Returns display columns in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns filters in display order.
    #[must_use]
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Looks up one filter by key.
    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|filter| filter.key() == key)
    }

    /// Returns allowed actions.
    #[must_use]
    pub fn allowed_actions(&self) -> &BTreeSet<EntityAction> {
        &self.allowed_actions
    }

    /// Returns whether an action is allowed.
    #[must_use]
    pub fn allows(&self, action: EntityAction) -> bool {
        self.allowed_actions.contains(&action)
    }

    /// Returns form fields in order.
    #[must_use]
    pub fn form_fields(&self) -> &[FormFieldSpec] {
        &self.form_fields
    }

    /// Returns keys of required form fields.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.form_fields
            .iter()
            .filter(|field| field.is_required())
            .map(FormFieldSpec::key)
            .collect()
    }

    /// Returns the pagination scheme.
    #[must_use]
    pub fn pagination(&self) -> &PaginationScheme {
        &self.pagination
    }

    /// Returns the page size.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns a copy requesting `page_size` rows per page.
    /// Returns a copy with another page size. Zero is a configuration error.
    pub fn with_page_size(&self, page_size: usize) -> AppResult<Self> {
        if page_size == 0 {
            return Err(AppError::Config(format!(
                "entity '{}' page size must be greater than zero",
                self.entity_id
            )));
        }

        Ok(Self {
            page_size,
            ..self.clone()
        })
    }

    /// Returns the search mode.
    #[must_use]
    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    /// Returns the update method.
    #[must_use]
    pub fn update_method(&self) -> UpdateMethod {
        self.update_method
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityAction, EntitySchema, EntitySchemaInput, EndpointStrategy};
    use crate::{ColumnSpec, FilterKind, FilterSpec};

    fn input() -> EntitySchemaInput {
        let mut input = EntitySchemaInput::new("schools", "Sekolah", "/admin/schools/");
        input.columns = vec![ColumnSpec::text("name", "Nama").unwrap_or_else(|_| unreachable!())];
        input
    }

    #[test]
    fn schema_requires_columns() {
        let mut input = input();
        input.columns.clear();
        assert!(EntitySchema::new(input).is_err());
    }

    #[test]
    fn schema_rejects_duplicate_column_keys() {
        let mut input = input();
        input
            .columns
            .push(ColumnSpec::text("name", "Nama lagi").unwrap_or_else(|_| unreachable!()));
        assert!(EntitySchema::new(input).is_err());
    }

    #[test]
    fn schema_rejects_duplicate_filter_keys() {
        let mut input = input();
        let filter = FilterSpec::plain("npsn", "NPSN", FilterKind::Search)
            .unwrap_or_else(|_| unreachable!());
        input.filters = vec![filter.clone(), filter];
        assert!(EntitySchema::new(input).is_err());
    }

    #[test]
    fn resource_path_defaults_the_list_endpoint() {
        let schema = EntitySchema::new(input()).unwrap_or_else(|_| unreachable!());
        assert_eq!(schema.resource_path(), "/admin/schools");
        assert_eq!(schema.list_endpoints().len(), 1);
        assert_eq!(schema.list_endpoints()[0].path(), "/admin/schools");
    }

    #[test]
    fn fallback_schema_is_view_only() {
        let schema = EntitySchema::fallback("nonexistent");
        assert!(schema.columns().is_empty());
        assert_eq!(schema.display_name(), "nonexistent");
        assert!(schema.allows(EntityAction::View));
        assert_eq!(schema.allowed_actions().len(), 1);
    }

    #[test]
    fn endpoint_paths_must_be_absolute() {
        assert!(EndpointStrategy::new("legacy", "sppg").is_err());
    }

    #[test]
    fn page_size_override_is_validated() {
        let schema = EntitySchema::new(input()).unwrap_or_else(|_| unreachable!());
        let resized = schema.with_page_size(50).unwrap_or_else(|_| unreachable!());
        assert_eq!(resized.page_size(), 50);
        assert!(schema.with_page_size(0).is_err());

        let fallback = EntitySchema::fallback("reports")
            .with_page_size(5)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(fallback.page_size(), 5);
    }
}
