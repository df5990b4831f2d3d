//! Error handling module for export operations.
//!
//! Errors fall into the categories the engine reports to operators:
//! - Configuration errors (unknown or duplicate fields, bad prefetch paths)
//! - Validation errors (filter trees that reference the wrong fields or operators)
//! - Resolution errors (collaborator failures, fatal only in strict mode)
//! - Access errors (unknown or inactive profile hash)
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_export::error::{ConfigError, Result};
//!
//! fn lookup(key: &str) -> Result<()> {
//!     Err(ConfigError::UnknownField(key.to_string()).into())
//! }
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    AccessError, ConfigError, ExportError, ResolutionError, Result, StorageError, ValidationError,
};
