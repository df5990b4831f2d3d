//! Merged lookup over built-in and attribute fields

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::DynamicAttribute;
use crate::error::{ConfigError, Result};
use crate::planner::RelationPath;

use super::attribute;
use super::builtin::builtin_fields;
use super::FieldDescriptor;

/// All fields known to the engine, in display order
///
/// Built once per export from the current attribute definitions, so an
/// attribute added at runtime shows up on the next build without code changes.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Registry with only the built-in fields
    pub fn builtin() -> Result<Self> {
        Self::build(&[])
    }

    /// Registry with the built-in fields plus one field per attribute
    ///
    /// Fails on duplicate keys and on prefetch paths no store can load.
    pub fn build(attributes: &[DynamicAttribute]) -> Result<Self> {
        let mut fields = builtin_fields();
        fields.extend(attributes.iter().map(attribute::synthesize));
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (pos, field) in fields.iter().enumerate() {
            if index.insert(field.key.clone(), pos).is_some() {
                return Err(ConfigError::DuplicateField(field.key.clone()).into());
            }
            for path in &field.prefetch_paths {
                if RelationPath::parse(path).is_none() {
                    return Err(ConfigError::UnknownPrefetchPath {
                        field: field.key.clone(),
                        path: path.clone(),
                    }
                    .into());
                }
            }
        }
        debug!(fields = fields.len(), "field registry built");
        Ok(Self { fields, index })
    }

    pub fn lookup(&self, key: &str) -> Result<&FieldDescriptor> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownField(key.to_string()).into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.index.get(key).map(|&pos| &self.fields[pos])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn all(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn exportable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_exportable())
    }

    pub fn filterable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_filterable())
    }

    /// Exportable fields grouped for selection menus, groups in first-seen order
    pub fn export_groups(&self) -> Vec<(&str, Vec<&FieldDescriptor>)> {
        group_by(self.exportable(), |f| f.group.as_str())
    }

    /// Filterable fields grouped for filter builders
    pub fn filter_groups(&self) -> Vec<(&str, Vec<&FieldDescriptor>)> {
        group_by(self.filterable(), |f| f.filter_group())
    }
}

fn group_by<'a>(
    fields: impl Iterator<Item = &'a FieldDescriptor>,
    key: impl Fn(&'a FieldDescriptor) -> &'a str,
) -> Vec<(&'a str, Vec<&'a FieldDescriptor>)> {
    let mut groups: Vec<(&str, Vec<&FieldDescriptor>)> = Vec::new();
    for field in fields {
        let name = key(field);
        match groups.iter_mut().find(|(g, _)| *g == name) {
            Some((_, members)) => members.push(field),
            None => groups.push((name, vec![field])),
        }
    }
    groups
}
