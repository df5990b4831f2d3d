//! Catalog Export Library
//!
//! Profile-driven export of a product catalog into JSON, CSV, XML or XLSX.
//! An operator saves an export profile (fields, filters, format, optional
//! client context); anyone holding the profile's hash can download the
//! current export.
//!
//! # Modules
//!
//! - `catalog`: Product model and the in-memory and MongoDB catalog stores
//! - `fields`: Field descriptors and the registry of built-in and attribute fields
//! - `planner`: Eager-fetch planning of relation paths
//! - `filter`: Filter trees, their compiler and predicates
//! - `resolver`: Row resolution with display modifiers
//! - `services`: Pricing, stock and currency collaborators
//! - `profile`: Export profiles and their stores
//! - `export`: Streaming export engine, format writers and downloads
//! - `config`: Configuration management
//! - `cli`: Command-line interface
//! - `error`: Error types and handling

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fields;
pub mod filter;
pub mod planner;
pub mod profile;
pub mod resolver;
pub mod services;

// Re-export commonly used types
pub use config::Config;
pub use error::{ExportError, Result};
pub use export::{DownloadService, ExportEngine, ExportJob};
pub use fields::FieldRegistry;
pub use profile::{ExportProfile, ProfileService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
