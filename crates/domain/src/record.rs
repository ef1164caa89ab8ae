use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sppg_core::{AppError, AppResult};

/// Opaque row returned by a remote list endpoint.
///
/// The core never interprets a record beyond resolving property paths, so a
/// record is a thin wrapper over a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates a record from a JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Creates a record from any JSON value, rejecting non-objects.
    pub fn from_value(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::Validation(format!(
                "record payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the record identifier from the `id` field, if any.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(value) if !value.trim().is_empty() => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Resolves a dotted property path such as `sppg.name`.
    ///
    /// A literal top-level key wins over path traversal, so backends that
    /// flatten joined columns into `"sppg.name"` keys still resolve.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(fields) => fields.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Sets a top-level field.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the record into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Record;

    fn school() -> Record {
        Record::from_value(json!({
            "id": 7,
            "name": "SDN 1 Cibinong",
            "sppg": { "name": "SPPG Bogor Utara", "region": "Bogor" },
            "menus": [{ "name": "Nasi Ayam" }],
            "sppg.code": "BGR-01"
        }))
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn record_requires_object_payload() {
        assert!(Record::from_value(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn numeric_ids_are_stringified() {
        assert_eq!(school().id().as_deref(), Some("7"));
    }

    #[test]
    fn dotted_paths_resolve_nested_objects_and_arrays() {
        let row = school();
        assert_eq!(row.get_path("sppg.region"), Some(&json!("Bogor")));
        assert_eq!(row.get_path("menus.0.name"), Some(&json!("Nasi Ayam")));
        assert_eq!(row.get_path("sppg.code"), Some(&json!("BGR-01")));
        assert_eq!(row.get_path("sppg.missing"), None);
        assert_eq!(row.get_path("name.first"), None);
    }
}
