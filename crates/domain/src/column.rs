use serde::{Deserialize, Serialize};
use serde_json::Value;
use sppg_core::{AppError, AppResult, NonEmptyString};

use crate::record::Record;
use crate::temporal::parse_temporal;

const MISSING_CELL: &str = "-";

/// Visual tone attached to badge cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    /// Default grey badge.
    Neutral,
    /// Informational badge.
    Info,
    /// Positive state.
    Success,
    /// Needs attention.
    Warning,
    /// Negative state.
    Danger,
}

/// Mapping from one raw value to a badge label and tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeVariant {
    value: String,
    label: String,
    tone: BadgeTone,
}

impl BadgeVariant {
    /// Creates a badge variant.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>, tone: BadgeTone) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            tone,
        }
    }

    /// Returns the raw value matched by this variant.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }
}

/// Declarative cell renderer.
///
/// Renderers are data, not closures, so the presentation layer can be
/// swapped without touching schema definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellRenderer {
    /// Plain text, optionally falling back to another row field.
    Text {
        /// Field read when the column value is missing.
        fallback_field: Option<String>,
    },
    /// Fixed-precision number.
    Number {
        /// Digits after the decimal point.
        decimals: u8,
    },
    /// Whole-unit currency with dot thousands separators.
    Currency {
        /// Symbol placed before the amount.
        prefix: String,
    },
    /// Date or timestamp formatted with a chrono format string.
    Date {
        /// chrono `strftime` format.
        format: String,
    },
    /// Status badge.
    Badge {
        /// Known values; unknown values render as neutral badges.
        variants: Vec<BadgeVariant>,
    },
    /// Boolean flag with custom labels.
    Boolean {
        /// Label for `true`.
        true_label: String,
        /// Label for `false`.
        false_label: String,
    },
}

impl Default for CellRenderer {
    fn default() -> Self {
        Self::Text {
            fallback_field: None,
        }
    }
}

/// Presentational value produced by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDisplay {
    /// Text shown in the cell.
    pub text: String,
    /// Badge tone, for badge cells.
    pub tone: Option<BadgeTone>,
}

impl CellDisplay {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }

    fn missing() -> Self {
        Self::text(MISSING_CELL)
    }
}

impl CellRenderer {
    /// Renders one cell. Pure: the output depends only on `value` and `row`.
    #[must_use]
    pub fn render(&self, value: Option<&Value>, row: &Record) -> CellDisplay {
        let value = value.filter(|value| !value.is_null());

        match self {
            Self::Text { fallback_field } => value
                .or_else(|| {
                    fallback_field
                        .as_deref()
                        .and_then(|field| row.get_path(field))
                        .filter(|value| !value.is_null())
                })
                .and_then(plain_text)
                .map(CellDisplay::text)
                .unwrap_or_else(CellDisplay::missing),
            Self::Number { decimals } => value
                .and_then(numeric_value)
                .map(|number| CellDisplay::text(format!("{number:.*}", usize::from(*decimals))))
                .unwrap_or_else(CellDisplay::missing),
            Self::Currency { prefix } => value
                .and_then(numeric_value)
                .map(|amount| CellDisplay::text(format_currency(prefix, amount)))
                .unwrap_or_else(CellDisplay::missing),
            Self::Date { format } => value
                .and_then(Value::as_str)
                .map(|raw| match parse_temporal(raw) {
                    Some(timestamp) => CellDisplay::text(timestamp.format(format).to_string()),
                    None => CellDisplay::text(raw),
                })
                .unwrap_or_else(CellDisplay::missing),
            Self::Badge { variants } => {
                let Some(raw) = value.and_then(plain_text) else {
                    return CellDisplay::missing();
                };
                match variants.iter().find(|variant| variant.value == raw) {
                    Some(variant) => CellDisplay {
                        text: variant.label.clone(),
                        tone: Some(variant.tone),
                    },
                    None => CellDisplay {
                        text: raw,
                        tone: Some(BadgeTone::Neutral),
                    },
                }
            }
            Self::Boolean {
                true_label,
                false_label,
            } => match value.and_then(truthiness) {
                Some(true) => CellDisplay::text(true_label.clone()),
                Some(false) => CellDisplay::text(false_label.clone()),
                None => CellDisplay::missing(),
            },
        }
    }
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truthiness(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_i64().map(|number| number != 0),
        Value::String(text) => match text.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn format_currency(prefix: &str, amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if prefix.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{prefix} {grouped}")
    }
}

/// Display column of an entity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    key: NonEmptyString,
    label: String,
    width: Option<u16>,
    #[serde(default)]
    renderer: CellRenderer,
}

impl ColumnSpec {
    /// Creates a validated column.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        width: Option<u16>,
        renderer: CellRenderer,
    ) -> AppResult<Self> {
        let key = NonEmptyString::new(key)
            .map_err(|_| AppError::Config("column key must not be empty".to_owned()))?;
        if key.as_str().split('.').any(str::is_empty) {
            return Err(AppError::Config(format!(
                "column key '{}' is not a valid property path",
                key.as_str()
            )));
        }

        if width == Some(0) {
            return Err(AppError::Config(format!(
                "column '{}' width must be greater than zero",
                key.as_str()
            )));
        }

        Ok(Self {
            key,
            label: label.into(),
            width,
            renderer,
        })
    }

    /// Creates a plain text column.
    pub fn text(key: impl Into<String>, label: impl Into<String>) -> AppResult<Self> {
        Self::new(key, label, None, CellRenderer::default())
    }

    /// Returns the property path read from each row.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the header label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the layout width hint.
    #[must_use]
    pub fn width(&self) -> Option<u16> {
        self.width
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &CellRenderer {
        &self.renderer
    }

    /// Renders this column for one row.
    #[must_use]
    pub fn render(&self, row: &Record) -> CellDisplay {
        self.renderer.render(row.get_path(self.key.as_str()), row)
    }
}
