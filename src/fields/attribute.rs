//! Fields synthesized from dynamic attributes
//!
//! Each administrator-defined attribute yields exactly one field keyed
//! `attribute.<slug>`. Select attributes may carry several values per product
//! and are exported through the multi-value modifier.

use crate::catalog::{AttributeScalar, AttributeType, DynamicAttribute, Product};
use crate::error::Result;

use super::{FieldDescriptor, FieldValue, FilterSource, ModifierType, Resolver, ValueType};

pub const ATTRIBUTE_PREFIX: &str = "attribute.";
pub const GROUP_ATTRIBUTES: &str = "Атрибуты";

/// Link from a synthesized field back to its attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    pub attribute_id: i64,
    pub kind: AttributeType,
}

impl AttributeBinding {
    pub fn resolve(&self, item: &Product) -> Result<FieldValue> {
        let values = item.attribute(self.attribute_id)?;

        if self.kind == AttributeType::Select {
            return Ok(FieldValue::List(values.iter().map(|v| v.as_text()).collect()));
        }

        let Some(first) = values.first() else {
            return Ok(FieldValue::Null);
        };
        Ok(match (self.kind, first) {
            (AttributeType::Boolean, AttributeScalar::Bool(b)) => FieldValue::Bool(*b),
            (AttributeType::Number, AttributeScalar::Number(n)) => FieldValue::Decimal(*n),
            (_, other) => FieldValue::Text(other.as_text()),
        })
    }
}

/// Value type a filter on this attribute compares as
pub fn value_type(kind: AttributeType) -> ValueType {
    match kind {
        AttributeType::String | AttributeType::Select => ValueType::Text,
        AttributeType::Number => ValueType::Numeric,
        AttributeType::Boolean => ValueType::Boolean,
    }
}

/// Build the field for one attribute definition
pub fn synthesize(attribute: &DynamicAttribute) -> FieldDescriptor {
    let display_name = match &attribute.unit {
        Some(unit) if !unit.is_empty() => format!("{}, {}", attribute.name, unit),
        _ => attribute.name.clone(),
    };
    let modifier = match attribute.kind {
        AttributeType::Select => ModifierType::MultiValue,
        AttributeType::Boolean => ModifierType::Boolean,
        _ => ModifierType::None,
    };
    let binding = AttributeBinding {
        attribute_id: attribute.id,
        kind: attribute.kind,
    };

    let mut field = FieldDescriptor::new(
        format!("{ATTRIBUTE_PREFIX}{}", attribute.slug),
        display_name,
        value_type(attribute.kind),
        Resolver::Attribute(binding),
    )
    .group(GROUP_ATTRIBUTES)
    .modifier(modifier)
    .prefetch(&["attribute_values"])
    .filter_by(FilterSource::Attribute {
        attribute_id: attribute.id,
    });

    if attribute.kind == AttributeType::Select && !attribute.values.is_empty() {
        field = field.describe(&format!("One of: {}", attribute.values.join(", ")));
    }
    field
}
