//! Export pipeline
//!
//! Streams a profile's matching products out of the catalog and writes one
//! document in the profile's format:
//!
//! 1. **CatalogScan** pages through the filtered catalog with the fetch plan
//! 2. **RowResolver** turns each product into an ordered row
//! 3. **FormatWriter** encodes rows as JSON, CSV, XML or XLSX
//!
//! [`ExportEngine`] orchestrates the three, and [`DownloadService`] puts the
//! public hash lookup in front of it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catalog_export::catalog::MemoryCatalog;
//! use catalog_export::export::{ExportEngine, ExportJob};
//! use catalog_export::filter::FilterNode;
//! use catalog_export::profile::{ExportFormat, ExportOptions, FieldSelection};
//! use catalog_export::services::Services;
//!
//! # async fn run(catalog: MemoryCatalog, services: Services) -> catalog_export::error::Result<()> {
//! let engine = ExportEngine::new(Arc::new(catalog), services);
//! let job = ExportJob {
//!     format: ExportFormat::Csv,
//!     client: None,
//!     fields: vec![FieldSelection::new("id"), FieldSelection::new("name")],
//!     filters: FilterNode::default(),
//!     options: ExportOptions::default(),
//! };
//! let summary = engine.run(&job, tokio::io::stdout()).await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod download;
pub mod progress;
pub mod streaming;
pub mod writers;

pub use coordinator::{ExportEngine, ExportJob, ExportSettings, ExportSummary};
pub use download::{Download, DownloadService};
pub use progress::ProgressTracker;
pub use streaming::{CatalogScan, StreamingQuery};
pub use writers::{ColumnSpec, FormatWriter};
