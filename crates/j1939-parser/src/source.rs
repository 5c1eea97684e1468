use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Reader};
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::encoding::detect_and_decode_with;
use crate::errors::{ParserAttempt, ParserError};
use crate::tabular::{SheetTable, Tabular, TextTable};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Tried in order; the first one present in the leading lines wins.
pub const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// An uploaded file opened for extraction: its sheets or parsed text table,
/// plus the decoded text itself when it is not a binary workbook.
pub struct LogSource {
    pub file_name: String,
    pub encoding: Option<&'static str>,
    pub text: Option<String>,
    pub delimiter: u8,
    pub tables: Vec<Box<dyn Tabular>>,
    /// Sheets or tables that could not be read.
    pub skipped: Vec<ParserAttempt>,
}

impl LogSource {
    /// Opens `bytes` as a workbook when the extension says so, otherwise as
    /// text in whatever encoding it decodes cleanly with.
    pub fn load(
        bytes: &[u8],
        file_name: &str,
        config: &ExtractorConfig,
    ) -> Result<Self, ParserError> {
        if is_workbook(file_name) {
            Self::load_workbook(bytes, file_name)
        } else {
            Ok(Self::load_text(bytes, file_name, config))
        }
    }

    /// Wraps tables that are already in memory.
    pub fn from_tables(file_name: &str, tables: Vec<Box<dyn Tabular>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            encoding: None,
            text: None,
            delimiter: DELIMITERS[0],
            tables,
            skipped: Vec::new(),
        }
    }

    fn load_workbook(bytes: &[u8], file_name: &str) -> Result<Self, ParserError> {
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|source| {
                ParserError::Workbook {
                    file_name: file_name.to_string(),
                    source,
                }
            })?;

        let mut source = Self::from_tables(file_name, Vec::new());
        for sheet in workbook.sheet_names() {
            match workbook.worksheet_range(&sheet) {
                Ok(range) => {
                    debug!(file = file_name, sheet = %sheet, rows = range.height(), "read sheet");
                    source.tables.push(Box::new(SheetTable::new(&sheet, range)));
                }
                Err(err) => {
                    let error = ParserError::Sheet {
                        file_name: file_name.to_string(),
                        sheet: sheet.clone(),
                        message: err.to_string(),
                    };
                    warn!(error = %error, "skipping sheet");
                    source.skipped.push(ParserAttempt::new("workbook", error.to_string()));
                }
            }
        }
        Ok(source)
    }

    fn load_text(bytes: &[u8], file_name: &str, config: &ExtractorConfig) -> Self {
        let decoded = detect_and_decode_with(bytes, config.encoding_fallback);
        let mut text = decoded.text;
        if text.starts_with('\u{FEFF}') {
            text.remove(0);
        }
        let delimiter = detect_delimiter(&text, config.header_search_lines);
        debug!(
            file = file_name,
            encoding = decoded.encoding,
            delimiter = %char::from(delimiter).escape_default(),
            "decoded text log"
        );

        let mut source = Self::from_tables(file_name, Vec::new());
        source.encoding = Some(decoded.encoding);
        source.delimiter = delimiter;
        match TextTable::parse(file_name, &text, delimiter) {
            Ok(table) => source.tables.push(Box::new(table)),
            Err(error) => {
                warn!(file = file_name, error = %error, "text is not tabular");
                source.skipped.push(ParserAttempt::new("text_table", error.to_string()));
            }
        }
        source.text = Some(text);
        source
    }
}

fn is_workbook(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

pub fn detect_delimiter(text: &str, lines: usize) -> u8 {
    let leading: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(lines.max(1))
        .collect();
    DELIMITERS
        .into_iter()
        .find(|&delimiter| {
            leading
                .iter()
                .any(|line| line.contains(char::from(delimiter)))
        })
        .unwrap_or(DELIMITERS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_priority() {
        assert_eq!(detect_delimiter("a;b\n1;2", 20), b';');
        assert_eq!(detect_delimiter("a\tb|c\n", 20), b'\t');
        assert_eq!(detect_delimiter("a,b;c\n", 20), b',');
        assert_eq!(detect_delimiter("no delimiters here", 20), b',');
    }

    #[test]
    fn workbook_extensions_are_case_insensitive() {
        assert!(is_workbook("Volvo_FH.XLSX"));
        assert!(is_workbook("report.xls"));
        assert!(!is_workbook("dump.csv"));
        assert!(!is_workbook("xlsx"));
    }
}
