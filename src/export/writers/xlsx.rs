//! XLSX writer
//!
//! Rows are buffered into a worksheet and the workbook is written to the
//! sink on finalize. Integers, decimals and booleans become typed cells;
//! everything else is a string cell. Null values leave the cell empty.

use async_trait::async_trait;
use rust_xlsxwriter::{DocProperties, Format, Workbook, Worksheet};
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::fields::{FieldValue, Locale};
use crate::resolver::ResolvedRow;

use super::{ColumnSpec, FormatWriter, Sink};

/// Rows per worksheet, header included
pub const MAX_ROWS: u32 = 1_048_576;

const SHEET_NAME: &str = "Products";

pub struct XlsxWriter<W: AsyncWrite + Unpin + Send> {
    sink: Sink<W>,
    columns: Vec<ColumnSpec>,
    worksheet: Option<Worksheet>,
    /// Next row to fill; row 0 holds the header
    next_row: u32,
    finalized: bool,
}

impl<W: AsyncWrite + Unpin + Send> XlsxWriter<W> {
    pub fn new(sink: W, columns: Vec<ColumnSpec>) -> Self {
        Self {
            sink: Sink::new(sink),
            columns,
            worksheet: None,
            next_row: 1,
            finalized: false,
        }
    }

    fn worksheet(&mut self) -> Result<&mut Worksheet> {
        if self.worksheet.is_none() {
            let mut sheet = Worksheet::new();
            sheet.set_name(SHEET_NAME)?;
            let bold = Format::new().set_bold();
            for (col, column) in self.columns.iter().enumerate() {
                sheet.write_string_with_format(0, col_index(col)?, &column.label, &bold)?;
            }
            self.worksheet = Some(sheet);
        }
        self.worksheet
            .as_mut()
            .ok_or_else(|| ExportError::Serialization("XLSX: worksheet unavailable".to_string()))
    }
}

fn col_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| ExportError::Serialization(format!("XLSX: too many columns ({col})")))
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Null => {}
        FieldValue::Integer(_) | FieldValue::Decimal(_) => match value.as_f64() {
            Some(n) => {
                sheet.write_number(row, col, n)?;
            }
            None => {
                sheet.write_string(row, col, value.render_text(Locale::default()))?;
            }
        },
        FieldValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        other => {
            sheet.write_string(row, col, other.render_text(Locale::default()))?;
        }
    }
    Ok(())
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for XlsxWriter<W> {
    async fn write_batch(&mut self, rows: &[ResolvedRow]) -> Result<usize> {
        if self.next_row as u64 + rows.len() as u64 > MAX_ROWS as u64 {
            return Err(ExportError::Serialization(format!(
                "XLSX: more than {} rows",
                MAX_ROWS - 1
            )));
        }

        let width = self.columns.len();
        let mut row_index = self.next_row;
        let sheet = self.worksheet()?;
        for row in rows {
            for col in 0..width {
                if let Some(value) = row.value(col) {
                    write_cell(sheet, row_index, col_index(col)?, value)?;
                }
            }
            row_index += 1;
        }
        self.next_row = row_index;
        Ok(rows.len())
    }

    async fn finalize(&mut self, truncated: bool) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.worksheet()?;

        let mut workbook = Workbook::new();
        if truncated {
            let properties = DocProperties::new().set_comment("truncated");
            workbook.set_properties(&properties);
        }
        if let Some(sheet) = self.worksheet.take() {
            workbook.push_worksheet(sheet);
        }
        let buffer = workbook.save_to_buffer()?;

        self.sink.write(&buffer).await?;
        self.sink.flush().await?;
        self.finalized = true;
        debug!(rows = self.next_row - 1, truncated, bytes = buffer.len(), "XLSX writer finalized");
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.bytes()
    }
}
