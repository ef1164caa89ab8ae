use serde_json::{Map, Value};
use sppg_application::ListPage;
use sppg_core::{AppError, AppResult};
use sppg_domain::Record;

const ROW_KEYS: [&str; 3] = ["items", "rows", "data"];
const TOTAL_KEYS: [&str; 3] = ["total", "total_count", "count"];

/// Maps an HTTP status and body onto the error taxonomy.
///
/// Returns the parsed body on success. Envelopes may report failure with
/// `success: false` even on a 2xx status.
pub(super) fn classify_response(status: u16, body: &str) -> AppResult<Value> {
    let parsed = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(body)
    };
    let message = parsed.as_ref().ok().and_then(envelope_message);

    if status == 401 || status == 403 {
        return Err(AppError::Unauthorized {
            status: Some(status),
            message,
        });
    }

    if !(200..300).contains(&status) {
        return Err(AppError::Server {
            status: Some(status),
            message,
        });
    }

    let envelope = parsed.map_err(|error| {
        AppError::Network(format!("entity API returned an undecodable body: {error}"))
    })?;
    if envelope.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(AppError::Server {
            status: Some(status),
            message,
        });
    }

    Ok(envelope)
}

/// Decodes a list envelope into one page of rows.
///
/// `data` may be the row array itself or an object wrapping it under
/// `items`, `rows` or `data` next to paging metadata.
pub(super) fn decode_page(envelope: Value) -> AppResult<ListPage> {
    let (payload, outer) = split_envelope(envelope);

    let (rows, meta) = match payload {
        Value::Array(rows) => (rows, Map::new()),
        Value::Object(mut meta) => {
            let rows = ROW_KEYS
                .iter()
                .find_map(|key| match meta.remove(*key) {
                    Some(Value::Array(rows)) => Some(rows),
                    _ => None,
                })
                .ok_or_else(|| {
                    AppError::Network("entity API list response carries no row array".to_owned())
                })?;
            (rows, meta)
        }
        Value::Null => (Vec::new(), Map::new()),
        other => {
            return Err(AppError::Network(format!(
                "entity API list response has unexpected shape: {other}"
            )));
        }
    };

    let rows = rows
        .into_iter()
        .map(Record::from_value)
        .collect::<AppResult<Vec<_>>>()
        .map_err(|error| AppError::Network(format!("entity API returned a malformed row: {error}")))?;

    Ok(ListPage {
        rows,
        total_count: total_count(&meta).or_else(|| total_count(&outer)),
        next_cursor: next_cursor(&meta).or_else(|| next_cursor(&outer)),
    })
}

/// Returns the record echoed by a mutation, if the server sent one.
pub(super) fn decode_record(envelope: Value) -> Option<Record> {
    match split_envelope(envelope).0 {
        Value::Object(fields) if !fields.is_empty() => Some(Record::new(fields)),
        _ => None,
    }
}

fn split_envelope(envelope: Value) -> (Value, Map<String, Value>) {
    match envelope {
        Value::Object(mut outer) if outer.contains_key("success") || outer.contains_key("data") => {
            let payload = outer.remove("data").unwrap_or(Value::Null);
            (payload, outer)
        }
        other => (other, Map::new()),
    }
}

fn envelope_message(envelope: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| envelope.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}

fn total_count(meta: &Map<String, Value>) -> Option<u64> {
    TOTAL_KEYS
        .iter()
        .find_map(|key| meta.get(*key).and_then(count_value))
        .or_else(|| {
            meta.get("pagination")
                .and_then(|pagination| pagination.get("total"))
                .and_then(count_value)
        })
}

fn next_cursor(meta: &Map<String, Value>) -> Option<String> {
    meta.get("next_cursor")
        .or_else(|| {
            meta.get("pagination")
                .and_then(|pagination| pagination.get("next_cursor"))
        })
        .and_then(|cursor| match cursor {
            Value::String(cursor) if !cursor.is_empty() => Some(cursor.clone()),
            Value::Number(cursor) => Some(cursor.to_string()),
            _ => None,
        })
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
