//! Export profiles
//!
//! A profile is a reusable export definition: ordered field selection, filter
//! tree, output format and an optional client whose prices and stock the
//! export reflects. Each profile carries an unguessable hash that acts as the
//! bearer credential for its public download.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ClientId, OperatorId};
use crate::fields::Locale;
use crate::filter::FilterNode;

pub mod file;
pub mod hash;
pub mod service;
pub mod store;

pub use file::FileProfileStore;
pub use service::ProfileService;
pub use store::{MemoryProfileStore, ProfileStore};

pub const DEFAULT_SEPARATOR: &str = ", ";

/// Output format of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
    /// Spreadsheet, written as an XLSX workbook
    #[serde(alias = "xlsx")]
    Xls,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xml => "application/xml",
            ExportFormat::Xls => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
            ExportFormat::Xls => "xlsx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xml" => Ok(ExportFormat::Xml),
            "xls" | "xlsx" => Ok(ExportFormat::Xls),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// What labels columns and object keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    #[default]
    DisplayName,
    Key,
}

/// Rendering options stored with a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Joins multi-value fields
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Abort on the first collaborator failure instead of degrading the field
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub header: HeaderStyle,

    /// Language of yes/no labels in text formats
    #[serde(default)]
    pub locale: Locale,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            strict: false,
            header: HeaderStyle::default(),
            locale: Locale::default(),
        }
    }
}

/// One selected field, optionally priced in a specific currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl FieldSelection {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            currency: None,
        }
    }

    pub fn in_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    /// Parse `key` or `key:CUR` as used on the command line
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((key, currency)) if !currency.is_empty() => Self::new(key).in_currency(currency),
            _ => Self::new(raw),
        }
    }
}

/// A persisted export profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProfile {
    pub id: Uuid,
    pub owner: OperatorId,
    #[serde(default)]
    pub client: Option<ClientId>,
    pub name: String,
    /// Immutable after creation
    pub hash: String,
    pub format: ExportFormat,
    pub fields: Vec<FieldSelection>,
    #[serde(default)]
    pub filters: FilterNode,
    #[serde(default)]
    pub options: ExportOptions,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ExportProfile {
    pub fn field_keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    /// Suggested download file name
    pub fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{stem}.{}", self.format.extension())
    }
}

/// Input to [`ProfileStore::create`]
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub owner: OperatorId,
    pub client: Option<ClientId>,
    pub name: String,
    pub format: ExportFormat,
    pub fields: Vec<FieldSelection>,
    pub filters: FilterNode,
    pub options: ExportOptions,
}

/// Partial update; `None` leaves a property unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the client context
    pub client: Option<Option<ClientId>>,
    pub format: Option<ExportFormat>,
    pub fields: Option<Vec<FieldSelection>>,
    pub filters: Option<FilterNode>,
    pub options: Option<ExportOptions>,
    pub is_active: Option<bool>,
}

impl ProfileUpdate {
    /// Apply to `profile`; the id and hash are never touched
    pub fn apply(self, profile: &mut ExportProfile, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(client) = self.client {
            profile.client = client;
        }
        if let Some(format) = self.format {
            profile.format = format;
        }
        if let Some(fields) = self.fields {
            profile.fields = fields;
        }
        if let Some(filters) = self.filters {
            profile.filters = filters;
        }
        if let Some(options) = self.options {
            profile.options = options;
        }
        if let Some(active) = self.is_active {
            profile.is_active = active;
        }
        profile.updated_at = now;
    }
}
