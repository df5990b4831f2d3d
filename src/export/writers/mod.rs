//! Format writers for resolved rows
//!
//! Every writer consumes [`ResolvedRow`] batches in order and never queries
//! data itself. Text formats stream to any `AsyncWrite` sink; the spreadsheet
//! writer buffers the workbook and emits it whole on finalize.
//!
//! A writer produces nothing until its first batch or its finalize call, so
//! an export that fails during setup leaves the sink untouched.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{ConfigError, Result};
use crate::fields::{FieldDescriptor, Locale, ModifierType, ValueType};
use crate::profile::{ExportFormat, HeaderStyle};
use crate::resolver::ResolvedRow;

pub mod csv;
pub mod json;
pub mod xlsx;
pub mod xml;

pub use csv::CsvWriter;
pub use json::JsonWriter;
pub use xlsx::XlsxWriter;
pub use xml::XmlWriter;

/// Trait for writing rows to different output formats
#[async_trait]
pub trait FormatWriter: Send {
    /// Write a batch of rows, returning how many were written
    async fn write_batch(&mut self, rows: &[ResolvedRow]) -> Result<usize>;

    /// Close the document and flush
    ///
    /// `truncated` marks an export stopped early; formats that can carry the
    /// flag in-band record it.
    async fn finalize(&mut self, truncated: bool) -> Result<()>;

    /// Bytes emitted to the sink so far
    fn bytes_written(&self) -> u64;
}

/// Output column derived from a selected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: String,
    pub label: String,
    pub value_type: ValueType,
    pub modifier: ModifierType,
}

impl ColumnSpec {
    pub fn from_descriptor(field: &FieldDescriptor, header: HeaderStyle) -> Self {
        let label = match header {
            HeaderStyle::DisplayName => field.display_name.clone(),
            HeaderStyle::Key => field.key.clone(),
        };
        Self {
            key: field.key.clone(),
            label,
            value_type: field.value_type,
            modifier: field.modifier,
        }
    }

    /// Column for a selected field, naming a currency override in the label
    pub fn for_selection(field: &FieldDescriptor, currency: Option<&str>, header: HeaderStyle) -> Self {
        let mut column = Self::from_descriptor(field, header);
        if let Some(code) = currency {
            column.label = format!("{} ({})", column.label, code);
        }
        column
    }
}

/// Suffix repeated labels with their occurrence number
///
/// JSON objects are keyed by label, so two columns sharing one would collapse.
pub fn unique_labels(columns: &mut [ColumnSpec]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for column in columns.iter_mut() {
        let count = seen.entry(column.label.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            column.label = format!("{} ({})", column.label, count);
        }
    }
}

/// Build the writer for `format` over `sink`
pub fn for_format<'a, W>(
    format: ExportFormat,
    columns: Vec<ColumnSpec>,
    locale: Locale,
    sink: W,
) -> Box<dyn FormatWriter + 'a>
where
    W: AsyncWrite + Unpin + Send + 'a,
{
    match format {
        ExportFormat::Json => Box::new(JsonWriter::new(sink, columns)),
        ExportFormat::Csv => Box::new(CsvWriter::new(sink, columns, locale)),
        ExportFormat::Xml => Box::new(XmlWriter::new(sink, columns, locale)),
        ExportFormat::Xls => Box::new(XlsxWriter::new(sink, columns)),
    }
}

/// Buffered sink that counts what it emits
pub(crate) struct Sink<W: AsyncWrite + Unpin + Send> {
    inner: BufWriter<W>,
    bytes: u64,
}

impl<W: AsyncWrite + Unpin + Send> Sink<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(64 * 1024, inner),
            bytes: 0,
        }
    }

    pub(crate) async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).await?;
        self.bytes += data.len() as u64;
        Ok(())
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Create the output file, checking its directory first
pub async fn create_file(path: &Path) -> Result<File> {
    validate_path(path)?;
    Ok(File::create(path).await?)
}

/// Reject paths whose parent directory does not exist
pub fn validate_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidValue {
                field: "output".to_string(),
                value: format!("directory does not exist: {}", parent.display()),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::fields::FieldValue;

    /// Three columns covering text, price and boolean rendering
    pub fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec {
                key: "name".to_string(),
                label: "Наименование".to_string(),
                value_type: ValueType::Text,
                modifier: ModifierType::None,
            },
            ColumnSpec {
                key: "base_price".to_string(),
                label: "Базовая цена".to_string(),
                value_type: ValueType::Numeric,
                modifier: ModifierType::Price,
            },
            ColumnSpec {
                key: "is_new".to_string(),
                label: "Новинка".to_string(),
                value_type: ValueType::Boolean,
                modifier: ModifierType::Boolean,
            },
        ]
    }

    pub fn row(id: i64, name: &str, price: i64, is_new: bool) -> ResolvedRow {
        let mut price = Decimal::from(price);
        price.rescale(2);
        ResolvedRow {
            item_id: id,
            values: vec![
                ("name".to_string(), FieldValue::Text(name.to_string())),
                ("base_price".to_string(), FieldValue::Decimal(price)),
                ("is_new".to_string(), FieldValue::Bool(is_new)),
            ],
            errors: Vec::new(),
        }
    }

    pub fn dated_row() -> ResolvedRow {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap();
        ResolvedRow {
            item_id: 9,
            values: vec![
                ("name".to_string(), FieldValue::Null),
                ("base_price".to_string(), FieldValue::Null),
                ("is_new".to_string(), FieldValue::DateTime(at)),
            ],
            errors: Vec::new(),
        }
    }

    /// Run a writer over an in-memory buffer
    pub async fn render(
        format: ExportFormat,
        columns: Vec<ColumnSpec>,
        rows: &[ResolvedRow],
        truncated: bool,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = for_format(format, columns, Locale::Ru, &mut out);
            writer.write_batch(rows).await.unwrap();
            writer.finalize(truncated).await.unwrap();
        }
        out
    }
}
