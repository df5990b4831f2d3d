//! Filter tree to predicate compilation
//!
//! Traversal is depth-first. Each condition goes through the registry lookup,
//! the filterability gate, then a builder chosen by the field's value type.
//! Nothing is ever dropped silently: every rejected condition is an error.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::trace;

use crate::catalog::Scalar;
use crate::catalog::columns::DateBound;
use crate::error::{Result, ValidationError};
use crate::fields::{FieldDescriptor, FieldRegistry, FilterSource, ValueType};

use super::predicate::{Comparison, Predicate};
use super::{FilterNode, Logic};

/// Accepted date-time layouts besides a bare `YYYY-MM-DD`
const DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Operators accepted per value type
pub fn operators_for(value_type: ValueType) -> &'static [&'static str] {
    match value_type {
        ValueType::Text => &["equals", "contains"],
        ValueType::Numeric => &["equals", "gt", "gte", "lt", "lte", "between"],
        ValueType::Boolean => &["equals"],
        ValueType::Date => &["equals", "before", "after", "between"],
    }
}

pub struct FilterCompiler<'a> {
    registry: &'a FieldRegistry,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(registry: &'a FieldRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, node: &FilterNode) -> Result<Predicate> {
        match node {
            FilterNode::Group { logic, children } => self.compile_group(*logic, children),
            FilterNode::Condition {
                field_key,
                operator,
                value,
            } => self.compile_condition(field_key, operator, value),
        }
    }

    fn compile_group(&self, logic: Logic, children: &[FilterNode]) -> Result<Predicate> {
        if children.is_empty() {
            return Ok(match logic {
                Logic::And => Predicate::All,
                Logic::Or => Predicate::Nothing,
            });
        }

        let compiled = children
            .iter()
            .map(|child| self.compile(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(match (logic, compiled.len()) {
            (_, 1) => compiled.into_iter().next().unwrap_or(Predicate::All),
            (Logic::And, _) => Predicate::And(compiled),
            (Logic::Or, _) => Predicate::Or(compiled),
        })
    }

    fn compile_condition(&self, key: &str, operator: &str, value: &Value) -> Result<Predicate> {
        let field = self.registry.lookup(key)?;
        let Some(source) = field.filter else {
            return Err(ValidationError::FieldNotFilterable(key.to_string()).into());
        };

        let operator = operator.to_ascii_lowercase();
        if !operators_for(field.value_type).contains(&operator.as_str()) {
            return Err(ValidationError::InvalidOperator {
                field: key.to_string(),
                operator,
            }
            .into());
        }

        let cmp = build_comparison(field, &operator, value)?;
        trace!(field = key, ?cmp, "condition compiled");

        Ok(match source {
            FilterSource::Column(column) => Predicate::Column { column, cmp },
            FilterSource::Related(column) => Predicate::Related { column, cmp },
            FilterSource::Aggregate(aggregate) => Predicate::Aggregate { aggregate, cmp },
            FilterSource::Attribute { attribute_id } => Predicate::Attribute { attribute_id, cmp },
        })
    }
}

fn invalid(field: &FieldDescriptor, reason: impl Into<String>) -> crate::error::ExportError {
    ValidationError::InvalidValue {
        field: field.key.clone(),
        reason: reason.into(),
    }
    .into()
}

fn build_comparison(field: &FieldDescriptor, operator: &str, value: &Value) -> Result<Comparison> {
    match operator {
        "contains" => {
            let needle = value
                .as_str()
                .ok_or_else(|| invalid(field, "expected a string"))?;
            Ok(Comparison::Contains(needle.to_lowercase()))
        }
        "between" => {
            let bounds = value
                .as_array()
                .filter(|items| items.len() == 2)
                .ok_or_else(|| invalid(field, "expected a two-element array"))?;
            let lower = parse_scalar(field, &bounds[0])?;
            let upper = parse_scalar(field, &bounds[1])?;
            if lower.compare(&upper) == Some(std::cmp::Ordering::Greater) {
                return Err(invalid(field, "lower bound is greater than upper bound"));
            }
            Ok(Comparison::Between(lower, upper))
        }
        _ => {
            let scalar = parse_scalar(field, value)?;
            Ok(match operator {
                "gt" | "after" => Comparison::Gt(scalar),
                "gte" => Comparison::Gte(scalar),
                "lt" | "before" => Comparison::Lt(scalar),
                "lte" => Comparison::Lte(scalar),
                _ => Comparison::Equals(scalar),
            })
        }
    }
}

fn parse_scalar(field: &FieldDescriptor, value: &Value) -> Result<Scalar> {
    match field.value_type {
        ValueType::Text => match value {
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Number(n) => Ok(Scalar::Text(n.to_string())),
            _ => Err(invalid(field, "expected a string")),
        },
        ValueType::Numeric => parse_decimal(value)
            .map(Scalar::Number)
            .ok_or_else(|| invalid(field, format!("expected a number, got {value}"))),
        ValueType::Boolean => match value {
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::String(s) if s == "true" || s == "1" => Ok(Scalar::Bool(true)),
            Value::String(s) if s == "false" || s == "0" => Ok(Scalar::Bool(false)),
            _ => Err(invalid(field, "expected true or false")),
        },
        ValueType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(Scalar::Date)
            .ok_or_else(|| invalid(field, format!("expected a date, got {value}"))),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// Bare dates compare by day, values with a time compare exactly
fn parse_date(raw: &str) -> Option<DateBound> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(DateBound::Day(day));
    }
    DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(DateBound::Instant)
}
