//! Filter trees and their compilation
//!
//! Profiles store filters as a JSON tree of groups and conditions. The
//! [`FilterCompiler`] validates that tree against the field registry and turns
//! it into a [`Predicate`], which the in-memory catalog evaluates directly and
//! the MongoDB catalog renders into a query document.

use serde::{Deserialize, Serialize};

pub mod compiler;
pub mod mongo;
pub mod predicate;

#[cfg(test)]
mod tests;

pub use compiler::FilterCompiler;
pub use predicate::{Comparison, Predicate};

/// Boolean connective of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// A node in a stored filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group {
        #[serde(default)]
        logic: Logic,
        children: Vec<FilterNode>,
    },
    Condition {
        #[serde(alias = "field")]
        field_key: String,
        #[serde(alias = "op")]
        operator: String,
        #[serde(default)]
        value: serde_json::Value,
    },
}

impl Default for FilterNode {
    /// An empty AND group, which matches every product
    fn default() -> Self {
        FilterNode::Group {
            logic: Logic::And,
            children: Vec::new(),
        }
    }
}

impl FilterNode {
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            logic: Logic::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            logic: Logic::Or,
            children,
        }
    }

    pub fn condition(field_key: &str, operator: &str, value: serde_json::Value) -> Self {
        FilterNode::Condition {
            field_key: field_key.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    /// True for the empty AND group
    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterNode::Group { logic: Logic::And, children } if children.is_empty())
    }
}
