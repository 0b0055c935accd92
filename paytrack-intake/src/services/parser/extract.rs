//! Plain-text extraction for the accepted document formats
//!
//! - TXT: decoded as UTF-8 (invalid sequences replaced)
//! - DOCX: paragraphs of `word/document.xml` inside the ZIP container
//! - PDF: literal strings shown inside uncompressed BT/ET text objects

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};

use super::ParseError;
use crate::models::contract::DocumentKind;

/// Extract the text content of a document
pub fn extract_text(kind: DocumentKind, bytes: &[u8]) -> Result<String, ParseError> {
    let text = match kind {
        DocumentKind::PlainText => String::from_utf8_lossy(bytes).into_owned(),
        DocumentKind::Docx => extract_docx(bytes)?,
        DocumentKind::Pdf => extract_pdf(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    Ok(text)
}

static XML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

fn extract_docx(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Extraction(format!("not a DOCX container: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ParseError::Extraction(format!("missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ParseError::Extraction(format!("unreadable word/document.xml: {}", e)))?;

    // Paragraph, line-break and tab markers become whitespace before tags are dropped
    let xml = xml
        .replace("</w:p>", "\n")
        .replace("<w:br/>", "\n")
        .replace("<w:tab/>", "\t");
    let text = XML_TAG.replace_all(&xml, "");

    Ok(unescape_xml(&text))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ParseError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(ParseError::Extraction("missing %PDF header".to_string()));
    }

    let text = PdfTextScanner::new(bytes).scan();
    if text.trim().is_empty() && contains(bytes, b"/FlateDecode") {
        return Err(ParseError::Extraction(
            "PDF text is stored in compressed streams; configure parser_url to use a remote parser"
                .to_string(),
        ));
    }
    Ok(text)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Minimal content-stream scanner: collects string operands between `BT` and
/// `ET`, turning line-positioning operators into newlines
struct PdfTextScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    out: String,
}

impl<'a> PdfTextScanner<'a> {
    /// TJ kerning adjustments at or below this value read as a word gap
    const WORD_GAP: f64 = -200.0;

    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            out: String::new(),
        }
    }

    fn scan(mut self) -> String {
        let mut in_text = false;
        let mut in_array = false;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if !in_text {
                if self.keyword_at(b"BT") {
                    in_text = true;
                    self.pos += 2;
                } else {
                    self.pos += 1;
                }
                continue;
            }

            match b {
                b'(' => {
                    let literal = self.read_literal();
                    self.out.push_str(&literal);
                    continue;
                }
                b'[' => in_array = true,
                b']' => in_array = false,
                b'\'' | b'"' => self.newline(),
                b'-' | b'0'..=b'9' | b'.' if in_array => {
                    if let Some(n) = self.read_number() {
                        if n <= Self::WORD_GAP {
                            self.out.push(' ');
                        }
                    }
                    continue;
                }
                b'T' if matches!(self.bytes.get(self.pos + 1), Some(b'*' | b'd' | b'D')) => {
                    self.newline();
                    self.pos += 2;
                    continue;
                }
                b'E' if self.keyword_at(b"ET") => {
                    in_text = false;
                    in_array = false;
                    self.newline();
                    self.pos += 2;
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }

        self.out
    }

    fn newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Operator keyword delimited by whitespace or start/end of input
    fn keyword_at(&self, keyword: &[u8]) -> bool {
        let end = self.pos + keyword.len();
        if end > self.bytes.len() || &self.bytes[self.pos..end] != keyword {
            return false;
        }
        let before_ok = self.pos == 0 || self.bytes[self.pos - 1].is_ascii_whitespace();
        let after_ok = end == self.bytes.len() || self.bytes[end].is_ascii_whitespace();
        before_ok && after_ok
    }

    fn read_number(&mut self) -> Option<f64> {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'-' | b'0'..=b'9' | b'.')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
    }

    /// Literal string with balanced parentheses and backslash escapes
    fn read_literal(&mut self) -> String {
        let mut depth = 0usize;
        let mut text = String::new();

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            match b {
                b'(' => {
                    if depth > 0 {
                        text.push('(');
                    }
                    depth += 1;
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    text.push(')');
                }
                b'\\' => {
                    let Some(&next) = self.bytes.get(self.pos) else {
                        break;
                    };
                    self.pos += 1;
                    match next {
                        b'n' => text.push('\n'),
                        b'r' => text.push('\r'),
                        b't' => text.push('\t'),
                        b'(' | b')' | b'\\' => text.push(next as char),
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;
                            for _ in 0..2 {
                                match self.bytes.get(self.pos) {
                                    Some(&d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            if let Some(c) = char::from_u32(value) {
                                text.push(c);
                            }
                        }
                        // Line continuation
                        b'\n' | b'\r' => {}
                        other => text.push(other as char),
                    }
                }
                // PDFDocEncoding is close enough to Latin-1 for contract text
                other => text.push(other as char),
            }
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_plain_text() {
        let text = extract_text(DocumentKind::PlainText, b"Basic Salary: 50000").unwrap();
        assert_eq!(text, "Basic Salary: 50000");
    }

    #[test]
    fn test_blank_text_is_empty_document() {
        let err = extract_text(DocumentKind::PlainText, b"   \n\t ").unwrap_err();
        assert_eq!(err, ParseError::EmptyDocument);
    }

    #[test]
    fn test_docx_paragraphs() {
        let bytes = docx_with(
            r#"<w:document><w:body><w:p><w:r><w:t>Employee ID: E-1</w:t></w:r></w:p><w:p><w:r><w:t>HRA &amp; LTA</w:t></w:r></w:p></w:body></w:document>"#,
        );
        let text = extract_text(DocumentKind::Docx, &bytes).unwrap();
        assert_eq!(text, "Employee ID: E-1\nHRA & LTA\n");
    }

    #[test]
    fn test_corrupt_docx() {
        let err = extract_text(DocumentKind::Docx, b"not a zip").unwrap_err();
        assert!(matches!(err, ParseError::Extraction(_)));
    }

    #[test]
    fn test_pdf_text_objects() {
        let pdf = b"%PDF-1.4\n1 0 obj\n<< /Length 80 >>\nstream\nBT /F1 12 Tf 72 700 Td (Employee ID: E-9) Tj 0 -14 Td [(Basic)-250(Salary: 40000)] TJ ET\nendstream\nendobj\n%%EOF";
        let text = extract_text(DocumentKind::Pdf, pdf).unwrap();
        assert!(text.contains("Employee ID: E-9"), "got {:?}", text);
        assert!(text.contains("Basic Salary: 40000"), "got {:?}", text);
    }

    #[test]
    fn test_pdf_escapes() {
        let pdf = b"%PDF-1.4\nBT (Name: A \\(B\\) C) Tj ET";
        let text = extract_text(DocumentKind::Pdf, pdf).unwrap();
        assert_eq!(text.trim(), "Name: A (B) C");
    }

    #[test]
    fn test_compressed_pdf_reports_extraction_error() {
        let pdf = b"%PDF-1.5\n<< /Filter /FlateDecode /Length 3 >>\nstream\nxyz\nendstream";
        let err = extract_text(DocumentKind::Pdf, pdf).unwrap_err();
        assert!(matches!(err, ParseError::Extraction(msg) if msg.contains("parser_url")));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = extract_text(DocumentKind::Pdf, b"hello").unwrap_err();
        assert!(matches!(err, ParseError::Extraction(_)));
    }
}
