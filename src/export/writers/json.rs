//! JSON writer
//!
//! Emits one array of objects. Keys are column labels in selection order;
//! numbers and booleans stay typed. An export stopped early gets a final
//! `{"_truncated": true}` element.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::error::Result;
use crate::resolver::ResolvedRow;

use super::{ColumnSpec, FormatWriter, Sink};

/// Element closing the array of an export stopped early
pub const TRUNCATION_MARKER: &str = r#"{"_truncated":true}"#;

pub struct JsonWriter<W: AsyncWrite + Unpin + Send> {
    sink: Sink<W>,
    columns: Vec<ColumnSpec>,
    /// Whether the opening bracket has been written
    opened: bool,
    written: usize,
}

impl<W: AsyncWrite + Unpin + Send> JsonWriter<W> {
    pub fn new(sink: W, columns: Vec<ColumnSpec>) -> Self {
        Self {
            sink: Sink::new(sink),
            columns,
            opened: false,
            written: 0,
        }
    }

    fn to_object(&self, row: &ResolvedRow) -> Value {
        let object: Map<String, Value> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let value = row.value(index).map(|v| v.to_json()).unwrap_or(Value::Null);
                (column.label.clone(), value)
            })
            .collect();
        Value::Object(object)
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for JsonWriter<W> {
    async fn write_batch(&mut self, rows: &[ResolvedRow]) -> Result<usize> {
        for row in rows {
            let json = serde_json::to_string(&self.to_object(row))?;
            let prefix: &[u8] = match (self.opened, self.written) {
                (false, _) => b"[\n",
                (true, 0) => b"",
                (true, _) => b",\n",
            };
            self.opened = true;
            self.sink.write(prefix).await?;
            self.sink.write(json.as_bytes()).await?;
            self.written += 1;
        }
        Ok(rows.len())
    }

    async fn finalize(&mut self, truncated: bool) -> Result<()> {
        if truncated {
            let prefix: &[u8] = if self.opened { b",\n" } else { b"[\n" };
            self.sink.write(prefix).await?;
            self.sink.write(TRUNCATION_MARKER.as_bytes()).await?;
            self.opened = true;
        }
        if self.opened {
            self.sink.write(b"\n]\n").await?;
        } else {
            self.sink.write(b"[]\n").await?;
        }
        self.sink.flush().await?;
        debug!(rows = self.written, truncated, "JSON writer finalized");
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.bytes()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::export::writers::testing;
    use crate::profile::ExportFormat;

    #[tokio::test]
    async fn test_json_array_keeps_field_order() {
        let rows = vec![testing::row(1, "Лампа", 100, true), testing::row(2, "Чайник", 250, false)];
        let out = testing::render(ExportFormat::Json, testing::columns(), &rows, false).await;
        let text = String::from_utf8(out).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"Наименование": "Лампа", "Базовая цена": 100.0, "Новинка": true},
                {"Наименование": "Чайник", "Базовая цена": 250.0, "Новинка": false}
            ])
        );
        let first = text.lines().nth(1).unwrap();
        assert!(first.find("Наименование").unwrap() < first.find("Новинка").unwrap());
    }

    #[tokio::test]
    async fn test_empty_json_is_empty_array() {
        let out = testing::render(ExportFormat::Json, testing::columns(), &[], false).await;
        assert_eq!(out, b"[]\n");
    }

    #[tokio::test]
    async fn test_truncated_json_ends_with_marker() {
        let rows = vec![testing::row(1, "Лампа", 100, true)];
        let out = testing::render(ExportFormat::Json, testing::columns(), &rows, true).await;
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"Наименование": "Лампа", "Базовая цена": 100.0, "Новинка": true},
                {"_truncated": true}
            ])
        );

        let out = testing::render(ExportFormat::Json, testing::columns(), &[], true).await;
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!([{"_truncated": true}]));
    }
}
