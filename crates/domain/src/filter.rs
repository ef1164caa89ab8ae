use serde::{Deserialize, Serialize};
use serde_json::Value;
use sppg_core::{AppError, AppResult, NonEmptyString};

/// Supported filter input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// One value from a discrete option list.
    Select,
    /// `true` or `false`.
    Boolean,
    /// Inclusive date interval with optional bounds.
    DateRange,
    /// Free-text substring filter on one field.
    Search,
    /// Exact number or inclusive numeric interval.
    Number,
}

impl FilterKind {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Boolean => "boolean",
            Self::DateRange => "date_range",
            Self::Search => "search",
            Self::Number => "number",
        }
    }
}

/// One selectable option of a discrete filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    value: Value,
    label: String,
}

impl FilterOption {
    /// Creates an option.
    #[must_use]
    pub fn new(value: Value, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }

    /// Returns the option value sent to the backend.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the option label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }
}

/// Reference to the lookup call that fills a filter's options at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicOptionsSource {
    lookup: NonEmptyString,
    path: NonEmptyString,
    value_field: NonEmptyString,
    label_field: NonEmptyString,
}

impl DynamicOptionsSource {
    /// Creates a lookup reference.
    pub fn new(
        lookup: impl Into<String>,
        path: impl Into<String>,
        value_field: impl Into<String>,
        label_field: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            lookup: NonEmptyString::new(lookup).map_err(config_error)?,
            path: NonEmptyString::new(path).map_err(config_error)?,
            value_field: NonEmptyString::new(value_field).map_err(config_error)?,
            label_field: NonEmptyString::new(label_field).map_err(config_error)?,
        })
    }

    /// Returns the lookup identifier, e.g. `regions`.
    #[must_use]
    pub fn lookup(&self) -> &str {
        self.lookup.as_str()
    }

    /// Returns the endpoint path serving the lookup rows.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the row field used as option value.
    #[must_use]
    pub fn value_field(&self) -> &str {
        self.value_field.as_str()
    }

    /// Returns the row field used as option label.
    #[must_use]
    pub fn label_field(&self) -> &str {
        self.label_field.as_str()
    }
}

/// Where a filter's options come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "options", rename_all = "snake_case")]
pub enum OptionsSource {
    /// Options fixed at schema definition time.
    Static(Vec<FilterOption>),
    /// Options loaded from a lookup collaborator.
    Dynamic(DynamicOptionsSource),
}

/// Filter definition of an entity table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    key: NonEmptyString,
    label: String,
    kind: FilterKind,
    field: NonEmptyString,
    options: OptionsSource,
}

impl FilterSpec {
    /// Creates a validated filter.
    ///
    /// `field` is the row property compared by local filtering; it defaults to
    /// `key` when absent.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FilterKind,
        field: Option<String>,
        options: OptionsSource,
    ) -> AppResult<Self> {
        let key = NonEmptyString::new(key).map_err(config_error)?;
        let field = match field {
            Some(field) => NonEmptyString::new(field).map_err(config_error)?,
            None => key.clone(),
        };

        let spec = Self {
            key,
            label: label.into(),
            kind,
            field,
            options,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Creates a select filter with fixed options.
    pub fn select(
        key: impl Into<String>,
        label: impl Into<String>,
        options: Vec<FilterOption>,
    ) -> AppResult<Self> {
        Self::new(key, label, FilterKind::Select, None, OptionsSource::Static(options))
    }

    /// Creates a select filter whose options come from a lookup.
    pub fn dynamic_select(
        key: impl Into<String>,
        label: impl Into<String>,
        source: DynamicOptionsSource,
    ) -> AppResult<Self> {
        Self::new(key, label, FilterKind::Select, None, OptionsSource::Dynamic(source))
    }

    /// Creates a boolean filter.
    pub fn boolean(
        key: impl Into<String>,
        label: impl Into<String>,
        true_label: impl Into<String>,
        false_label: impl Into<String>,
    ) -> AppResult<Self> {
        Self::new(
            key,
            label,
            FilterKind::Boolean,
            None,
            OptionsSource::Static(vec![
                FilterOption::new(Value::Bool(true), true_label),
                FilterOption::new(Value::Bool(false), false_label),
            ]),
        )
    }

    /// Creates an option-less filter of the given kind.
    pub fn plain(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FilterKind,
    ) -> AppResult<Self> {
        Self::new(key, label, kind, None, OptionsSource::Static(Vec::new()))
    }

    /// Checks kind/option invariants.
    pub fn validate(&self) -> AppResult<()> {
        match (self.kind, &self.options) {
            (FilterKind::Boolean, OptionsSource::Static(options)) => {
                let has = |flag: bool| {
                    options
                        .iter()
                        .filter(|option| option.value == Value::Bool(flag))
                        .count()
                        == 1
                };
                if options.len() != 2 || !has(true) || !has(false) {
                    return Err(AppError::Config(format!(
                        "boolean filter '{}' must offer exactly the values true and false",
                        self.key.as_str()
                    )));
                }
            }
            (FilterKind::Boolean, OptionsSource::Dynamic(_)) => {
                return Err(AppError::Config(format!(
                    "boolean filter '{}' cannot load options dynamically",
                    self.key.as_str()
                )));
            }
            (FilterKind::Select, _) => {}
            (_, OptionsSource::Static(options)) if options.is_empty() => {}
            (kind, _) => {
                return Err(AppError::Config(format!(
                    "{} filter '{}' does not take options",
                    kind.as_str(),
                    self.key.as_str()
                )));
            }
        }

        Ok(())
    }

    /// Returns the filter key used in queries.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the filter label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the filter kind.
    #[must_use]
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Returns the row property compared by local filtering.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the options source.
    #[must_use]
    pub fn options(&self) -> &OptionsSource {
        &self.options
    }

    /// Returns the dynamic source when options load at runtime.
    #[must_use]
    pub fn dynamic_source(&self) -> Option<&DynamicOptionsSource> {
        match &self.options {
            OptionsSource::Dynamic(source) => Some(source),
            OptionsSource::Static(_) => None,
        }
    }

    /// Returns a copy of this filter with resolved static options.
    #[must_use]
    pub fn with_resolved_options(&self, options: Vec<FilterOption>) -> Self {
        Self {
            options: OptionsSource::Static(options),
            ..self.clone()
        }
    }
}

/// Selected value of one active filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterValue {
    /// Exact value (select, boolean, number) or substring (search).
    Exact {
        /// Selected value.
        value: Value,
    },
    /// Inclusive interval; a missing bound is open.
    Range {
        /// Lower bound.
        from: Option<Value>,
        /// Upper bound.
        to: Option<Value>,
    },
}

impl FilterValue {
    /// Creates an exact filter value.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact {
            value: value.into(),
        }
    }

    /// Creates a range filter value.
    #[must_use]
    pub fn range(from: Option<Value>, to: Option<Value>) -> Self {
        Self::Range { from, to }
    }
}

fn config_error(error: AppError) -> AppError {
    AppError::Config(error.to_string())
}
