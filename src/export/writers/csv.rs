//! CSV writer
//!
//! Header row of column labels, one row per product, RFC 4180 quoting.
//! Booleans are rendered as locale labels. An export stopped early ends with
//! a `# truncated` line.

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::error::Result;
use crate::fields::Locale;
use crate::resolver::ResolvedRow;

use super::{ColumnSpec, FormatWriter, Sink};

pub struct CsvWriter<W: AsyncWrite + Unpin + Send> {
    sink: Sink<W>,
    columns: Vec<ColumnSpec>,
    locale: Locale,
    headers_written: bool,
    written: usize,
}

impl<W: AsyncWrite + Unpin + Send> CsvWriter<W> {
    pub fn new(sink: W, columns: Vec<ColumnSpec>, locale: Locale) -> Self {
        Self {
            sink: Sink::new(sink),
            columns,
            locale,
            headers_written: false,
            written: 0,
        }
    }

    async fn write_headers(&mut self) -> Result<()> {
        let line = self
            .columns
            .iter()
            .map(|c| escape_csv_value(&c.label))
            .collect::<Vec<_>>()
            .join(",");
        self.sink.write(line.as_bytes()).await?;
        self.sink.write(b"\n").await?;
        self.headers_written = true;
        debug!("Wrote CSV headers: {} fields", self.columns.len());
        Ok(())
    }

    async fn write_row(&mut self, row: &ResolvedRow) -> Result<()> {
        let line = (0..self.columns.len())
            .map(|index| {
                let text = row
                    .value(index)
                    .map(|v| v.render_text(self.locale))
                    .unwrap_or_default();
                escape_csv_value(&text)
            })
            .collect::<Vec<_>>()
            .join(",");
        self.sink.write(line.as_bytes()).await?;
        self.sink.write(b"\n").await
    }
}

/// Last line of an export stopped early
pub const TRUNCATION_LINE: &str = "# truncated\n";

/// Quote a value containing a comma, quote or line break
pub fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for CsvWriter<W> {
    async fn write_batch(&mut self, rows: &[ResolvedRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if !self.headers_written {
            self.write_headers().await?;
        }
        for row in rows {
            self.write_row(row).await?;
        }
        self.written += rows.len();
        debug!("Wrote batch of {} rows (total: {})", rows.len(), self.written);
        Ok(rows.len())
    }

    async fn finalize(&mut self, truncated: bool) -> Result<()> {
        // An empty export still gets its header
        if !self.headers_written {
            self.write_headers().await?;
        }
        if truncated {
            self.sink.write(TRUNCATION_LINE.as_bytes()).await?;
        }
        self.sink.flush().await?;
        debug!(rows = self.written, truncated, "CSV writer finalized");
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.bytes()
    }
}
