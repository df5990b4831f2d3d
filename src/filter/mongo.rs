//! Rendering predicates as MongoDB query documents
//!
//! Catalog documents embed their relations, so existence checks become
//! `$elemMatch` on the embedded array and aggregates become `$expr`
//! expressions. Dates are stored as ISO-8601 strings without offset, which
//! sort lexicographically; a whole-day bound is rendered as a half-open
//! string range covering that day.

use mongodb::bson::{Bson, Document, doc};
use rust_decimal::prelude::ToPrimitive;

use crate::catalog::columns::DateBound;
use crate::catalog::{Aggregate, Scalar};

use super::predicate::{Comparison, Predicate};

const STORED_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

impl Predicate {
    pub fn to_document(&self) -> Document {
        match self {
            Predicate::All => doc! {},
            Predicate::Nothing => doc! { "$expr": false },
            Predicate::And(children) => {
                let docs: Vec<Document> = children.iter().map(|c| c.to_document()).collect();
                doc! { "$and": docs }
            }
            Predicate::Or(children) if children.is_empty() => Predicate::Nothing.to_document(),
            Predicate::Or(children) => {
                let docs: Vec<Document> = children.iter().map(|c| c.to_document()).collect();
                doc! { "$or": docs }
            }
            Predicate::Column { column, cmp } => {
                let mut out = Document::new();
                out.insert(column.document_path(), field_condition(cmp));
                out
            }
            Predicate::Related { column, cmp } => {
                let (relation, field) = column.document_path();
                let mut out = Document::new();
                if column.is_collection() {
                    let mut inner = Document::new();
                    inner.insert(field, field_condition(cmp));
                    out.insert(relation, doc! { "$elemMatch": inner });
                } else {
                    out.insert(format!("{relation}.{field}"), field_condition(cmp));
                }
                out
            }
            Predicate::Aggregate { aggregate, cmp } => {
                doc! { "$expr": expr_condition(aggregate_expr(*aggregate), cmp) }
            }
            Predicate::Attribute { attribute_id, cmp } => doc! {
                "attribute_values": {
                    "$elemMatch": {
                        "attribute_id": *attribute_id,
                        "value": field_condition(cmp),
                    }
                }
            },
        }
    }
}

fn aggregate_expr(aggregate: Aggregate) -> Bson {
    match aggregate {
        Aggregate::TotalStock => Bson::Document(doc! { "$sum": "$warehouses.pivot.available" }),
        Aggregate::ImageCount => {
            Bson::Document(doc! { "$size": { "$ifNull": ["$images", []] } })
        }
    }
}

fn scalar_bson(scalar: &Scalar) -> Bson {
    match scalar {
        Scalar::Text(s) => Bson::String(s.clone()),
        Scalar::Number(n) => n.to_f64().map_or_else(|| Bson::String(n.to_string()), Bson::Double),
        Scalar::Bool(b) => Bson::Boolean(*b),
        Scalar::Date(DateBound::Day(d)) => Bson::String(d.format("%Y-%m-%d").to_string()),
        Scalar::Date(DateBound::Instant(t)) => Bson::String(t.format(STORED_DATETIME).to_string()),
    }
}

/// First string strictly after every instant of the bound's day
fn day_end(scalar: &Scalar) -> Option<Bson> {
    match scalar {
        Scalar::Date(DateBound::Day(d)) => d
            .succ_opt()
            .map(|next| Bson::String(next.format("%Y-%m-%d").to_string())),
        _ => None,
    }
}

/// Operator/operand pairs for one comparison
fn bounds(cmp: &Comparison) -> Vec<(&'static str, Bson)> {
    match cmp {
        Comparison::Equals(v) => match day_end(v) {
            Some(end) => vec![("$gte", scalar_bson(v)), ("$lt", end)],
            None => vec![("$eq", scalar_bson(v))],
        },
        Comparison::Contains(needle) => vec![
            ("$regex", Bson::String(escape_regex(needle))),
            ("$options", Bson::String("i".to_string())),
        ],
        Comparison::Gt(v) => match day_end(v) {
            Some(end) => vec![("$gte", end)],
            None => vec![("$gt", scalar_bson(v))],
        },
        Comparison::Gte(v) => vec![("$gte", scalar_bson(v))],
        Comparison::Lt(v) => vec![("$lt", scalar_bson(v))],
        Comparison::Lte(v) => match day_end(v) {
            Some(end) => vec![("$lt", end)],
            None => vec![("$lte", scalar_bson(v))],
        },
        Comparison::Between(lo, hi) => {
            let mut out = bounds(&Comparison::Gte(lo.clone()));
            out.extend(bounds(&Comparison::Lte(hi.clone())));
            out
        }
    }
}

fn field_condition(cmp: &Comparison) -> Document {
    bounds(cmp)
        .into_iter()
        .map(|(op, operand)| (op.to_string(), operand))
        .collect()
}

/// Aggregates are numeric, so `$regex` never reaches this path
fn expr_condition(expr: Bson, cmp: &Comparison) -> Document {
    let clauses: Vec<Document> = bounds(cmp)
        .into_iter()
        .map(|(op, operand)| {
            let mut clause = Document::new();
            clause.insert(op, vec![expr.clone(), operand]);
            clause
        })
        .collect();
    match clauses.len() {
        1 => clauses.into_iter().next().unwrap_or_default(),
        _ => doc! { "$and": clauses },
    }
}

fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
