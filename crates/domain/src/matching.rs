//! Client-side search and filter evaluation for entities whose backend does
//! not support the equivalent query parameters.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::filter::{FilterKind, FilterSpec, FilterValue};
use crate::record::Record;
use crate::schema::EntitySchema;
use crate::temporal::{parse_bound, parse_temporal};

/// Returns whether any searchable field contains `search_text`, ignoring case.
///
/// The text is matched as given, without trimming. Blank search text matches
/// every row. Null or missing fields are skipped.
#[must_use]
pub fn matches_search(row: &Record, searchable_fields: &[String], search_text: &str) -> bool {
    if search_text.trim().is_empty() {
        return true;
    }
    let needle = search_text.to_lowercase();

    searchable_fields.iter().any(|field| {
        row.get_path(field)
            .and_then(searchable_text)
            .is_some_and(|haystack| haystack.to_lowercase().contains(needle.as_str()))
    })
}

/// Returns whether a row satisfies one active filter.
#[must_use]
pub fn matches_filter(row: &Record, spec: &FilterSpec, selected: &FilterValue) -> bool {
    let stored = row.get_path(spec.field()).filter(|value| !value.is_null());

    match (spec.kind(), selected) {
        (FilterKind::Search, FilterValue::Exact { value }) => {
            let needle = value.as_str().map(str::trim).unwrap_or_default();
            needle.is_empty()
                || stored
                    .and_then(searchable_text)
                    .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase()))
        }
        (FilterKind::Number, FilterValue::Exact { value }) => stored
            .and_then(as_number)
            .zip(as_number(value))
            .is_some_and(|(left, right)| left == right),
        (_, FilterValue::Exact { value }) => stored == Some(value),
        (kind, FilterValue::Range { from, to }) => {
            let Some(stored) = stored else {
                return false;
            };
            let lower_ok = from
                .as_ref()
                .is_none_or(|from| compare_bound(kind, stored, from, false).is_some_and(Ordering::is_ge));
            let upper_ok = to
                .as_ref()
                .is_none_or(|to| compare_bound(kind, stored, to, true).is_some_and(Ordering::is_le));
            lower_ok && upper_ok
        }
    }
}

/// Returns whether a row satisfies the search predicate and every active filter.
///
/// Filter keys unknown to the schema never match; callers validate keys first.
#[must_use]
pub fn matches_query(
    schema: &EntitySchema,
    row: &Record,
    search_text: Option<&str>,
    active_filters: &BTreeMap<String, FilterValue>,
) -> bool {
    let search_ok = search_text
        .map(|text| matches_search(row, schema.searchable_fields(), text))
        .unwrap_or(true);

    search_ok
        && active_filters.iter().all(|(key, selected)| {
            schema
                .filter(key)
                .is_some_and(|spec| matches_filter(row, spec, selected))
        })
}

/// Filters rows locally, preserving their order.
#[must_use]
pub fn apply_local_query(
    schema: &EntitySchema,
    rows: &[Record],
    search_text: Option<&str>,
    active_filters: &BTreeMap<String, FilterValue>,
) -> Vec<Record> {
    rows.iter()
        .filter(|row| matches_query(schema, row, search_text, active_filters))
        .cloned()
        .collect()
}

fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn compare_bound(kind: FilterKind, stored: &Value, bound: &Value, upper: bool) -> Option<Ordering> {
    match kind {
        FilterKind::Number => as_number(stored)
            .zip(as_number(bound))
            .and_then(|(left, right)| left.partial_cmp(&right)),
        _ => {
            let stored = stored.as_str()?;
            let bound = bound.as_str()?;
            match (parse_temporal(stored), parse_bound(bound, upper)) {
                (Some(left), Some(right)) => Some(left.cmp(&right)),
                _ => Some(stored.cmp(bound)),
            }
        }
    }
}
