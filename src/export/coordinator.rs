//! Export run orchestration
//!
//! [`ExportEngine`] turns a profile into a document:
//!
//! 1. Build the field registry from the catalog's current attributes
//! 2. Validate the selection, plan relations and compile the filter
//! 3. Stream pages of products from the catalog
//! 4. Resolve each page with bounded, order-preserving concurrency
//! 5. Hand rows to the format writer and finalize
//!
//! Everything up to step 3 happens before the writer sees a byte, so
//! configuration and validation errors never leave partial output behind.
//! Cancellation and the optional deadline stop the run between pages or mid
//! resolution; the writer then closes a well-formed document flagged as
//! truncated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, ClientId, Product};
use crate::error::{ExportError, Result};
use crate::fields::FieldRegistry;
use crate::filter::{FilterCompiler, FilterNode};
use crate::planner::FetchPlan;
use crate::profile::{ExportFormat, ExportOptions, ExportProfile, FieldSelection};
use crate::resolver::{ResolvedRow, RowResolver};
use crate::services::Services;

use super::progress::ProgressTracker;
use super::streaming::{CatalogScan, StreamingQuery};
use super::writers::{self, ColumnSpec, FormatWriter};

/// Runtime knobs for an export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Products fetched per catalog page
    pub batch_size: usize,
    /// Products resolved concurrently within a page
    pub concurrency: usize,
    /// Stop and truncate after this long
    pub deadline: Option<Duration>,
    /// Draw a terminal progress bar
    pub progress: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            concurrency: 8,
            deadline: None,
            progress: false,
        }
    }
}

/// What to export, independent of where the definition is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub format: ExportFormat,
    #[serde(default)]
    pub client: Option<ClientId>,
    pub fields: Vec<FieldSelection>,
    #[serde(default)]
    pub filters: FilterNode,
    #[serde(default)]
    pub options: ExportOptions,
}

impl From<&ExportProfile> for ExportJob {
    fn from(profile: &ExportProfile) -> Self {
        Self {
            format: profile.format,
            client: profile.client,
            fields: profile.fields.clone(),
            filters: profile.filters.clone(),
            options: profile.options.clone(),
        }
    }
}

/// Result of an export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows written
    pub rows: u64,
    /// Rows with at least one field degraded to a neutral value
    pub degraded: u64,
    pub bytes: u64,
    /// Stopped early by cancellation or deadline
    pub truncated: bool,
    pub elapsed_ms: u64,
}

#[derive(Clone)]
pub struct ExportEngine {
    catalog: Arc<dyn CatalogStore>,
    services: Services,
    settings: ExportSettings,
    cancel_token: Option<CancellationToken>,
}

impl ExportEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, services: Services) -> Self {
        Self {
            catalog,
            services,
            settings: ExportSettings::default(),
            cancel_token: None,
        }
    }

    pub fn with_settings(mut self, settings: ExportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set cancellation token for runs of this engine
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Run `job` and write the document to `sink`
    pub async fn run<W>(&self, job: &ExportJob, sink: W) -> Result<ExportSummary>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let start_time = Instant::now();

        // Setup: nothing is written if any of this fails
        let registry = FieldRegistry::build(&self.catalog.attributes().await?)?;
        let resolver = RowResolver::new(&registry, &job.fields, job.client, self.services.clone())?
            .with_separator(&job.options.separator)
            .strict(job.options.strict);
        let keys: Vec<&str> = job.fields.iter().map(|f| f.key.as_str()).collect();
        let plan = FetchPlan::for_fields(&registry, &keys)?;
        let predicate = FilterCompiler::new(&registry).compile(&job.filters)?;
        let mut columns: Vec<ColumnSpec> = resolver
            .selections()
            .map(|(d, currency)| ColumnSpec::for_selection(d, currency, job.options.header))
            .collect();
        writers::unique_labels(&mut columns);
        debug!(
            fields = columns.len(),
            relations = plan.paths().len(),
            "Export planned"
        );

        let token = self
            .cancel_token
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        if token.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let total = if self.settings.progress {
            Some(self.catalog.count(&predicate).await?)
        } else {
            None
        };
        let tracker = ProgressTracker::new(total, self.settings.progress);

        let deadline = self.settings.deadline.map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!("Export deadline of {:?} reached", limit);
                token.cancel();
            })
        });

        let mut scan = CatalogScan::new(
            Arc::clone(&self.catalog),
            predicate,
            plan,
            self.settings.batch_size,
        );
        let mut writer = writers::for_format(job.format, columns, job.options.locale, sink);

        info!(format = ?job.format, "Starting export");
        let outcome = self
            .pump(&mut scan, &resolver, writer.as_mut(), &tracker, &token)
            .await;

        if let Some(handle) = deadline {
            handle.abort();
        }
        tracker.finish();

        let progress = match outcome {
            Ok(progress) => progress,
            Err((progress, err)) => {
                // Close what was already emitted; an untouched sink stays empty
                if progress.rows > 0 {
                    if let Err(e) = writer.finalize(true).await {
                        warn!("Failed to finalize partial export: {}", e);
                    }
                }
                return Err(err);
            }
        };

        writer.finalize(progress.truncated).await?;

        let summary = ExportSummary {
            rows: progress.rows,
            degraded: progress.degraded,
            bytes: writer.bytes_written(),
            truncated: progress.truncated,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        if summary.truncated {
            info!(
                "Export truncated: {} rows, {} bytes, {} ms",
                summary.rows, summary.bytes, summary.elapsed_ms
            );
        } else {
            info!(
                "Export completed: {} rows, {} bytes, {} ms",
                summary.rows, summary.bytes, summary.elapsed_ms
            );
        }
        Ok(summary)
    }

    async fn pump(
        &self,
        scan: &mut CatalogScan,
        resolver: &RowResolver,
        writer: &mut (dyn FormatWriter + '_),
        tracker: &ProgressTracker,
        token: &CancellationToken,
    ) -> std::result::Result<Progress, (Progress, ExportError)> {
        let mut progress = Progress::default();
        let mut batch_count = 0u32;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                batch = scan.next_batch() => Some(batch),
            };
            let products = match next {
                None => {
                    progress.truncated = true;
                    break;
                }
                Some(Ok(Some(products))) => products,
                Some(Ok(None)) => break,
                Some(Err(e)) => return Err((progress, e)),
            };

            let resolved = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                rows = resolve_page(resolver, &products, self.settings.concurrency) => Some(rows),
            };
            let rows = match resolved {
                None => {
                    progress.truncated = true;
                    break;
                }
                Some(Ok(rows)) => rows,
                Some(Err(e)) => return Err((progress, e)),
            };

            progress.degraded += rows.iter().filter(|r| r.is_degraded()).count() as u64;
            if let Err(e) = writer.write_batch(&rows).await {
                return Err((progress, e));
            }
            progress.rows += rows.len() as u64;
            tracker.update(progress.rows);

            batch_count += 1;
            if batch_count % 10 == 0 {
                info!(
                    "Progress: {} rows exported ({} pages)",
                    progress.rows, batch_count
                );
            }
        }

        if progress.truncated {
            info!("Export stopped after {} rows", progress.rows);
        }
        Ok(progress)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    rows: u64,
    degraded: u64,
    truncated: bool,
}

/// Resolve a page, `concurrency` products at a time, keeping catalog order
async fn resolve_page(
    resolver: &RowResolver,
    products: &[Product],
    concurrency: usize,
) -> Result<Vec<ResolvedRow>> {
    stream::iter(products)
        .map(|product| resolver.resolve(product))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}
