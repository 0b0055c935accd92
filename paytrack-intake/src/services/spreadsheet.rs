//! Tabular file reading for employee import
//!
//! CSV goes through the `csv` crate. XLSX is read directly from its ZIP
//! container: the first worksheet plus the shared string table.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use crate::error::{ApiError, ApiResult};

/// Header row plus data rows, all cells as trimmed text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Column index by normalized header name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Lowercase, trimmed, inner whitespace as underscores
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> ApiResult<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(SheetFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(SheetFormat::Xlsx)
        } else {
            Err(ApiError::InvalidInput(
                "Invalid file format. Please upload an Excel (.xlsx) or CSV (.csv) file.".to_string(),
            ))
        }
    }
}

pub fn read_sheet(format: SheetFormat, bytes: &[u8]) -> ApiResult<Sheet> {
    let mut sheet = match format {
        SheetFormat::Csv => read_csv(bytes)?,
        SheetFormat::Xlsx => read_xlsx(bytes)?,
    };
    sheet.headers = sheet.headers.iter().map(|h| normalize_header(h)).collect();
    // Drop fully blank rows
    sheet.rows.retain(|row| row.iter().any(|cell| !cell.is_empty()));
    Ok(sheet)
}

fn read_csv(bytes: &[u8]) -> ApiResult<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::InvalidInput(format!("Unreadable CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ApiError::InvalidInput(format!("Unreadable CSV row {}: {}", i + 1, e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Sheet { headers, rows })
}

static SHARED_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<si>(.*?)</si>").expect("valid regex"));
static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>").expect("valid regex"));
static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<row(?:\s[^>]*)?>(.*?)</row>").expect("valid regex"));
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<c((?:\s[^>]*?)?)(?:/>|>(.*?)</c>)").expect("valid regex")
});
static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\br="([A-Z]+)\d+""#).expect("valid regex"));
static CELL_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bt="([a-zA-Z]+)""#).expect("valid regex"));
static CELL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<v>(.*?)</v>").expect("valid regex"));

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Columns a worksheet can have (A..XFD)
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column index of a cell reference's letters ("A" → 0, "AB" → 27).
/// None past the last worksheet column.
fn column_index(letters: &str) -> Option<usize> {
    let number = letters.bytes().try_fold(0usize, |acc, b| {
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
    })?;
    (1..=MAX_COLUMNS).contains(&number).then(|| number - 1)
}

fn read_zip_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> ApiResult<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ApiError::InvalidInput(format!("Unreadable XLSX entry {}: {}", name, e))),
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ApiError::InvalidInput(format!("Unreadable XLSX entry {}: {}", name, e)))?;
    Ok(Some(xml))
}

fn read_xlsx(bytes: &[u8]) -> ApiResult<Sheet> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ApiError::InvalidInput(format!("Not a valid XLSX file: {}", e)))?;

    let shared: Vec<String> = read_zip_entry(&mut archive, "xl/sharedStrings.xml")?
        .map(|xml| {
            SHARED_STRING
                .captures_iter(&xml)
                .map(|si| {
                    TEXT_RUN
                        .captures_iter(&si[1])
                        .map(|t| unescape_xml(&t[1]))
                        .collect::<String>()
                })
                .collect()
        })
        .unwrap_or_default();

    let sheet_xml = read_zip_entry(&mut archive, "xl/worksheets/sheet1.xml")?
        .ok_or_else(|| ApiError::InvalidInput("XLSX file has no first worksheet".to_string()))?;

    let mut grid: Vec<Vec<String>> = Vec::new();
    for row in ROW.captures_iter(&sheet_xml) {
        let mut cells: BTreeMap<usize, String> = BTreeMap::new();
        let mut next_col = 0usize;

        for cell in CELL.captures_iter(&row[1]) {
            let attrs = cell.get(1).map_or("", |m| m.as_str());
            let body = cell.get(2).map_or("", |m| m.as_str());

            let col = match CELL_REF.captures(attrs) {
                Some(c) => column_index(&c[1]).ok_or_else(|| {
                    ApiError::InvalidInput(format!(
                        "XLSX column {} is beyond the last column (XFD)",
                        &c[1]
                    ))
                })?,
                None => next_col,
            };
            if col >= MAX_COLUMNS {
                return Err(ApiError::InvalidInput(
                    "XLSX row has more than 16384 columns".to_string(),
                ));
            }
            next_col = col + 1;

            let cell_type = CELL_TYPE.captures(attrs).map(|c| c[1].to_string());
            let raw = CELL_VALUE.captures(body).map(|v| unescape_xml(&v[1]));

            let value = match cell_type.as_deref() {
                Some("s") => raw
                    .and_then(|i| i.trim().parse::<usize>().ok())
                    .and_then(|i| shared.get(i).cloned())
                    .unwrap_or_default(),
                Some("inlineStr") => TEXT_RUN
                    .captures_iter(body)
                    .map(|t| unescape_xml(&t[1]))
                    .collect(),
                _ => raw.unwrap_or_default(),
            };
            cells.insert(col, value.trim().to_string());
        }

        let width = cells.keys().next_back().map_or(0, |last| last + 1);
        let mut values = vec![String::new(); width];
        for (col, value) in cells {
            values[col] = value;
        }
        grid.push(values);
    }

    let mut rows = grid.into_iter();
    let headers = rows
        .next()
        .ok_or_else(|| ApiError::InvalidInput("XLSX worksheet is empty".to_string()))?;
    Ok(Sheet {
        headers,
        rows: rows.collect(),
    })
}
