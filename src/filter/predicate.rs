//! Compiled filter predicates

use std::cmp::Ordering;

use crate::catalog::{Aggregate, AttributeScalar, Column, Product, RelatedColumn, Scalar};

/// One comparison against a stored value
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Equals(Scalar),
    /// Case-insensitive substring; the needle is stored lowercased
    Contains(String),
    Gt(Scalar),
    Gte(Scalar),
    Lt(Scalar),
    Lte(Scalar),
    /// Inclusive on both ends
    Between(Scalar, Scalar),
}

impl Comparison {
    pub fn test(&self, stored: &Scalar) -> bool {
        let ord = |bound: &Scalar| stored.compare(bound);
        match self {
            Comparison::Equals(v) => ord(v) == Some(Ordering::Equal),
            Comparison::Contains(needle) => match stored {
                Scalar::Text(s) => s.to_lowercase().contains(needle.as_str()),
                _ => false,
            },
            Comparison::Gt(v) => ord(v) == Some(Ordering::Greater),
            Comparison::Gte(v) => matches!(ord(v), Some(Ordering::Greater | Ordering::Equal)),
            Comparison::Lt(v) => ord(v) == Some(Ordering::Less),
            Comparison::Lte(v) => matches!(ord(v), Some(Ordering::Less | Ordering::Equal)),
            Comparison::Between(lo, hi) => {
                matches!(ord(lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(ord(hi), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

/// Executable filter over catalog products
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every product
    All,
    /// Matches no product
    Nothing,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Column {
        column: Column,
        cmp: Comparison,
    },
    /// At least one related value satisfies `cmp`
    Related {
        column: RelatedColumn,
        cmp: Comparison,
    },
    Aggregate {
        aggregate: Aggregate,
        cmp: Comparison,
    },
    /// At least one value of the attribute satisfies `cmp`
    Attribute {
        attribute_id: i64,
        cmp: Comparison,
    },
}

impl Predicate {
    /// Evaluate against a product with every relation loaded
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Nothing => false,
            Predicate::And(children) => children.iter().all(|p| p.matches(product)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(product)),
            Predicate::Column { column, cmp } => {
                column.value(product).is_some_and(|v| cmp.test(&v))
            }
            Predicate::Related { column, cmp } => column
                .values(product)
                .into_iter()
                .any(|v| cmp.test(&Scalar::Text(v))),
            Predicate::Aggregate { aggregate, cmp } => {
                cmp.test(&Scalar::Number(aggregate.value(product)))
            }
            Predicate::Attribute { attribute_id, cmp } => product
                .attribute_values
                .loaded()
                .into_iter()
                .flatten()
                .filter(|v| v.attribute_id == *attribute_id)
                .any(|v| cmp.test(&attribute_scalar(&v.value))),
        }
    }
}

fn attribute_scalar(value: &AttributeScalar) -> Scalar {
    match value {
        AttributeScalar::Bool(b) => Scalar::Bool(*b),
        AttributeScalar::Number(n) => Scalar::Number(*n),
        AttributeScalar::Text(s) => Scalar::Text(s.clone()),
    }
}
