//! Bytes to rows: size gate, text decoding, CSV parsing, header checks.
//!
//! Everything here fails the whole file with a [`CsvValidationError`]; no row
//! is looked at until the file as a whole is acceptable.
//!
//! ## Decoding
//!
//! | Step | Accepts |
//! |------|---------|
//! | UTF-8 with BOM | BOM is stripped |
//! | UTF-8 | |
//! | Latin-1 | only when no byte falls in 0x80–0x9F |
//! | Windows-1252 | fails on 0x81, 0x8D, 0x8F, 0x90, 0x9D |

use super::CsvValidationError;
use super::fields::REQUIRED_FIELDS;
use std::borrow::Cow;
use std::collections::HashMap;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 code points for 0x80..=0x9F; `None` marks undefined bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('€'),
    None,
    Some('‚'),
    Some('ƒ'),
    Some('„'),
    Some('…'),
    Some('†'),
    Some('‡'),
    Some('ˆ'),
    Some('‰'),
    Some('Š'),
    Some('‹'),
    Some('Œ'),
    None,
    Some('Ž'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('•'),
    Some('–'),
    Some('—'),
    Some('˜'),
    Some('™'),
    Some('š'),
    Some('›'),
    Some('œ'),
    None,
    Some('ž'),
    Some('Ÿ'),
];

fn is_c1(b: u8) -> bool {
    (0x80..=0x9F).contains(&b)
}

fn decode_latin1(content: &[u8]) -> Option<String> {
    if content.iter().copied().any(is_c1) {
        return None;
    }
    Some(content.iter().map(|&b| char::from(b)).collect())
}

fn decode_cp1252(content: &[u8]) -> Option<String> {
    content
        .iter()
        .map(|&b| {
            if is_c1(b) {
                CP1252_HIGH[usize::from(b - 0x80)]
            } else {
                Some(char::from(b))
            }
        })
        .collect()
}

/// Decode raw upload bytes to text, trying each encoding in turn.
pub fn decode_text(content: &[u8]) -> Result<Cow<'_, str>, CsvValidationError> {
    if let Some(rest) = content.strip_prefix(UTF8_BOM)
        && let Ok(text) = std::str::from_utf8(rest)
    {
        return Ok(Cow::Borrowed(text));
    }
    if let Ok(text) = std::str::from_utf8(content) {
        return Ok(Cow::Borrowed(text));
    }
    decode_latin1(content)
        .or_else(|| decode_cp1252(content))
        .map(Cow::Owned)
        .ok_or(CsvValidationError::Encoding)
}

/// `" Stock Number "` → `"stock_number"`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// One data row keyed by normalized header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Spreadsheet row number: the header is row 1, data starts at 2.
    pub number: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    /// Trimmed cell value, `None` when the column is absent or blank.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.cells
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Untrimmed cell value as given.
    pub fn raw(&self, field: &str) -> Option<&str> {
        self.cells.get(field).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Parse decoded text into normalized headers and keyed rows.
///
/// Short rows leave trailing columns absent; extra cells beyond the header
/// are ignored. Blank lines are skipped by the reader.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, CsvValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvValidationError::Malformed(e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.is_empty() {
        return Err(CsvValidationError::NoHeaders);
    }

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !headers.iter().any(|h| h == *f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvValidationError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CsvValidationError::Malformed(e.to_string()))?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(RawRow {
            number: i + 2,
            cells,
        });
    }

    if rows.is_empty() {
        return Err(CsvValidationError::NoDataRows);
    }
    Ok(ParsedCsv { headers, rows })
}

/// Full file gate: size, decoding, parsing.
pub fn read_csv(content: &[u8], max_mb: u32) -> Result<ParsedCsv, CsvValidationError> {
    let limit = u64::from(max_mb) * 1024 * 1024;
    if content.len() as u64 > limit {
        return Err(CsvValidationError::TooLarge { max_mb });
    }
    let text = decode_text(content)?;
    parse_csv(&text)
}
