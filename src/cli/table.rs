//! Table rendering for the `fields` and `profile list` commands

use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, Width, object::Columns, object::Rows},
};

use crate::fields::{FieldRegistry, ValueType};
use crate::profile::ExportProfile;

/// Maximum width for a single column (characters)
const MAX_COLUMN_WIDTH: usize = 40;

fn value_type_name(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Text => "text",
        ValueType::Numeric => "numeric",
        ValueType::Boolean => "boolean",
        ValueType::Date => "date",
    }
}

fn mark(flag: bool) -> &'static str {
    if flag { "yes" } else { "" }
}

fn finish(builder: Builder, columns: usize) -> String {
    let mut table = builder.build();
    table.with(Style::modern());
    for i in 0..columns {
        table.with(Modify::new(Columns::new(i..=i)).with(Width::wrap(MAX_COLUMN_WIDTH)));
    }
    table.with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// One row per field, grouped the way the export UI groups them
///
/// With `filterable_only` the filter grouping is used instead.
pub fn fields_table(registry: &FieldRegistry, filterable_only: bool) -> String {
    let header = ["Group", "Key", "Name", "Type", "Export", "Filter"];
    let mut builder = Builder::default();
    builder.push_record(header);

    let groups = if filterable_only {
        registry.filter_groups()
    } else {
        registry.export_groups()
    };
    for (group, fields) in groups {
        for field in fields {
            builder.push_record([
                group.to_string(),
                field.key.clone(),
                field.display_name.clone(),
                value_type_name(field.value_type).to_string(),
                mark(field.is_exportable()).to_string(),
                mark(field.is_filterable()).to_string(),
            ]);
        }
    }
    finish(builder, header.len())
}

pub fn profiles_table(profiles: &[ExportProfile]) -> String {
    let header = ["Id", "Name", "Format", "Fields", "Active", "Hash", "Last access"];
    let mut builder = Builder::default();
    builder.push_record(header);
    for profile in profiles {
        builder.push_record([
            profile.id.to_string(),
            profile.name.clone(),
            profile.format.extension().to_string(),
            profile.fields.len().to_string(),
            mark(profile.is_active).to_string(),
            profile.hash.clone(),
            profile
                .last_accessed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        ]);
    }
    finish(builder, header.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    #[test]
    fn test_fields_table_lists_attribute_fields() {
        let table = fields_table(&fixtures::registry(), false);
        assert!(table.contains("attribute.color"));
        assert!(table.contains("discounted_price"));
    }

    #[test]
    fn test_filterable_table_skips_personalized() {
        let table = fields_table(&fixtures::registry(), true);
        assert!(table.contains("brand.name"));
        assert!(!table.contains("discounted_price"));
    }
}
