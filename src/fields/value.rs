//! Resolved field values and their text rendering

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Value produced by a field resolver
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Multi-valued result, joined by the multi-value modifier
    List(Vec<String>),
}

/// Language of yes/no labels in text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    pub fn bool_label(&self, value: bool) -> &'static str {
        match (self, value) {
            (Locale::Ru, true) => "Да",
            (Locale::Ru, false) => "Нет",
            (Locale::En, true) => "Yes",
            (Locale::En, false) => "No",
        }
    }
}

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Plain-text rendering used by CSV and XML
    pub fn render_text(&self, locale: Locale) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Decimal(d) => d.to_string(),
            FieldValue::Bool(b) => locale.bool_label(*b).to_string(),
            FieldValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// JSON rendering; booleans and numbers stay typed
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::DateTime(dt) => {
                serde_json::Value::String(dt.format(DATETIME_FORMAT).to_string())
            }
            FieldValue::List(items) => serde_json::Value::from(items.clone()),
        }
    }

    /// Numeric value for typed spreadsheet cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_renders_locale_label() {
        assert_eq!(FieldValue::Bool(true).render_text(Locale::Ru), "Да");
        assert_eq!(FieldValue::Bool(false).render_text(Locale::En), "No");
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let mut d = Decimal::from(1000);
        d.rescale(2);
        assert_eq!(FieldValue::Decimal(d).render_text(Locale::Ru), "1000.00");
    }

    #[test]
    fn test_json_keeps_bool_typed() {
        assert_eq!(FieldValue::Bool(true).to_json(), serde_json::Value::Bool(true));
        assert_eq!(FieldValue::Null.to_json(), serde_json::Value::Null);
    }
}
