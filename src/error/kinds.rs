use std::{fmt, io};

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ExportError {
    /// Registry and profile configuration problems.
    Config(ConfigError),

    /// Filter tree and field selection validation failures.
    Validation(ValidationError),

    /// Failures while resolving a row in strict mode.
    Resolution(ResolutionError),

    /// Profile access failures.
    Access(AccessError),

    /// Catalog or profile store failures.
    Storage(StorageError),

    /// Output encoding failures.
    Serialization(String),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// Export stopped by cancellation before any output was produced.
    Cancelled,
}

/// Configuration errors, detected before an export is allowed to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Field key not present in the registry.
    UnknownField(String),

    /// Two fields share the same key.
    DuplicateField(String),

    /// Field declares a prefetch path no store can load.
    UnknownPrefetchPath { field: String, path: String },

    /// A resolver touched a relation outside the fetch plan.
    RelationNotLoaded(String),

    /// Field is selected for export but not exportable.
    FieldNotExportable(String),

    /// Profile selects no fields.
    EmptyFieldList,

    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Validation errors for filter trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Condition references a field that cannot be filtered on.
    FieldNotFilterable(String),

    /// Operator not valid for the field's value type.
    InvalidOperator { field: String, operator: String },

    /// Condition value does not fit the operator or value type.
    InvalidValue { field: String, reason: String },

    /// Structurally broken filter tree.
    MalformedFilter(String),
}

/// Row resolution errors raised by collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Pricing collaborator failed.
    Pricing(String),

    /// Stock collaborator failed.
    Stock(String),

    /// Currency conversion failed.
    Currency(String),
}

/// Profile access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Unknown or inactive profile.
    NotFound,
}

/// Storage backend errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Stored data could not be decoded.
    Corrupt(String),

    /// Write to the store failed.
    WriteFailed(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Validation(e) => write!(f, "Validation error: {e}"),
            ExportError::Resolution(e) => write!(f, "Resolution error: {e}"),
            ExportError::Access(e) => write!(f, "{e}"),
            ExportError::Storage(e) => write!(f, "Storage error: {e}"),
            ExportError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
            ExportError::MongoDb(e) => write!(f, "MongoDB error: {e}"),
            ExportError::Cancelled => write!(f, "Export cancelled"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownField(key) => write!(f, "Unknown field: {key}"),
            ConfigError::DuplicateField(key) => write!(f, "Duplicate field key: {key}"),
            ConfigError::UnknownPrefetchPath { field, path } => {
                write!(f, "Field '{field}' declares unknown prefetch path '{path}'")
            }
            ConfigError::RelationNotLoaded(path) => {
                write!(f, "Relation '{path}' is not part of the fetch plan")
            }
            ConfigError::FieldNotExportable(key) => write!(f, "Field is not exportable: {key}"),
            ConfigError::EmptyFieldList => write!(f, "Profile selects no fields"),
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldNotFilterable(key) => {
                write!(f, "Field is not filterable: {key}")
            }
            ValidationError::InvalidOperator { field, operator } => {
                write!(f, "Operator '{operator}' is not valid for field '{field}'")
            }
            ValidationError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for field '{field}': {reason}")
            }
            ValidationError::MalformedFilter(msg) => write!(f, "Malformed filter: {msg}"),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::Pricing(msg) => write!(f, "Pricing lookup failed: {msg}"),
            ResolutionError::Stock(msg) => write!(f, "Stock lookup failed: {msg}"),
            ResolutionError::Currency(msg) => write!(f, "Currency conversion failed: {msg}"),
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::NotFound => write!(f, "Export not found"),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Corrupt(msg) => write!(f, "Corrupt record: {msg}"),
            StorageError::WriteFailed(msg) => write!(f, "Write failed: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ResolutionError {}
impl std::error::Error for AccessError {}
impl std::error::Error for StorageError {}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<mongodb::error::Error> for ExportError {
    fn from(err: mongodb::error::Error) -> Self {
        ExportError::MongoDb(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}

impl From<ValidationError> for ExportError {
    fn from(err: ValidationError) -> Self {
        ExportError::Validation(err)
    }
}

impl From<ResolutionError> for ExportError {
    fn from(err: ResolutionError) -> Self {
        ExportError::Resolution(err)
    }
}

impl From<AccessError> for ExportError {
    fn from(err: AccessError) -> Self {
        ExportError::Access(err)
    }
}

impl From<StorageError> for ExportError {
    fn from(err: StorageError) -> Self {
        ExportError::Storage(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Serialization(format!("XLSX: {err}"))
    }
}

impl ExportError {
    /// True for errors that must surface as a plain "not found" to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExportError::Access(AccessError::NotFound))
    }
}
