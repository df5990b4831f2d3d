//! XML writer
//!
//! `<products>` root with one `<product>` per row. Child elements are named
//! after field keys, sanitized into valid XML names.

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::error::Result;
use crate::fields::{FieldValue, Locale};
use crate::resolver::ResolvedRow;

use super::{ColumnSpec, FormatWriter, Sink};

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<products>\n";

pub struct XmlWriter<W: AsyncWrite + Unpin + Send> {
    sink: Sink<W>,
    /// Sanitized element name per column
    elements: Vec<String>,
    locale: Locale,
    opened: bool,
    written: usize,
}

impl<W: AsyncWrite + Unpin + Send> XmlWriter<W> {
    pub fn new(sink: W, columns: Vec<ColumnSpec>, locale: Locale) -> Self {
        let elements = columns
            .into_iter()
            .map(|c| element_name(&c.key))
            .collect();
        Self {
            sink: Sink::new(sink),
            elements,
            locale,
            opened: false,
            written: 0,
        }
    }

    async fn open(&mut self) -> Result<()> {
        if !self.opened {
            self.sink.write(PROLOG.as_bytes()).await?;
            self.opened = true;
        }
        Ok(())
    }

    fn render_row(&self, row: &ResolvedRow) -> String {
        let mut out = String::from("  <product>\n");
        for (index, name) in self.elements.iter().enumerate() {
            match row.value(index) {
                None | Some(FieldValue::Null) => {
                    out.push_str(&format!("    <{name}/>\n"));
                }
                Some(value) => {
                    let text = escape_xml(&value.render_text(self.locale));
                    out.push_str(&format!("    <{name}>{text}</{name}>\n"));
                }
            }
        }
        out.push_str("  </product>\n");
        out
    }
}

/// Turn a field key into a valid XML element name
///
/// Letters and digits (Unicode included), `_`, `.` and `-` are kept; anything
/// else becomes `_`. Names that would start with a digit, `.`, `-` or the
/// reserved `xml` prefix get a leading `_`.
pub fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let bad_start = name
        .chars()
        .next()
        .is_none_or(|c| !(c.is_alphabetic() || c == '_'));
    if bad_start || name.to_ascii_lowercase().starts_with("xml") {
        name.insert(0, '_');
    }
    name
}

pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab and line breaks are not valid XML 1.0
            c if c.is_control() && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FormatWriter for XmlWriter<W> {
    async fn write_batch(&mut self, rows: &[ResolvedRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.open().await?;
        for row in rows {
            let rendered = self.render_row(row);
            self.sink.write(rendered.as_bytes()).await?;
        }
        self.written += rows.len();
        Ok(rows.len())
    }

    async fn finalize(&mut self, truncated: bool) -> Result<()> {
        self.open().await?;
        if truncated {
            self.sink.write(b"  <!-- truncated -->\n").await?;
        }
        self.sink.write(b"</products>\n").await?;
        self.sink.flush().await?;
        debug!(rows = self.written, truncated, "XML writer finalized");
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::writers::testing;
    use crate::profile::ExportFormat;

    #[test]
    fn test_element_name_sanitizing() {
        assert_eq!(element_name("name"), "name");
        assert_eq!(element_name("stock.total"), "stock.total");
        assert_eq!(element_name("attribute.цвет"), "attribute.цвет");
        assert_ne!(element_name("attribute.цвет"), element_name("attribute.вкус"));
        assert_eq!(element_name("attribute.size (EU)"), "attribute.size__EU_");
        assert_eq!(element_name("цвет"), "цвет");
        assert_eq!(element_name("1st"), "_1st");
        assert_eq!(element_name("xml_id"), "_xml_id");
        assert_eq!(element_name(""), "_");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("bell\u{7}"), "bell");
    }

    #[tokio::test]
    async fn test_xml_document_shape() {
        let rows = vec![testing::row(1, "Чай & кофе", 100, true)];
        let out = testing::render(ExportFormat::Xml, testing::columns(), &rows, false).await;
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <products>\n\
             \x20 <product>\n\
             \x20   <name>Чай &amp; кофе</name>\n\
             \x20   <base_price>100.00</base_price>\n\
             \x20   <is_new>Да</is_new>\n\
             \x20 </product>\n\
             </products>\n"
        );
    }

    #[tokio::test]
    async fn test_truncated_document_is_flagged_and_closed() {
        let out =
            testing::render(ExportFormat::Xml, testing::columns(), &[testing::dated_row()], true)
                .await;
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("    <name/>\n"));
        assert!(text.ends_with("  <!-- truncated -->\n</products>\n"));
    }
}
