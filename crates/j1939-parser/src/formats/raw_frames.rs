use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::can_id::{extract_pgn, parse_can_id};
use crate::config::ExtractorConfig;
use crate::errors::ParserError;
use crate::formats::common::{is_pgn_hex_header, is_placeholder, parse_hex_pgn};
use crate::model::{Extraction, PgnStats, StatsSource};
use crate::registry::LogExtractor;
use crate::source::LogSource;

const NAME: &str = "raw_frames";

const MIN_SCANNED_ID: u32 = 0x100;

// A bare `ID` header is left out: exports use it for row numbers.
static CAN_ID_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(can[\s_-]*id|arbitration[\s_-]*id|identifier|frame[\s_-]*id|msg[\s_-]*id|message[\s_-]*id)(\s*\(\s*h(ex)?\s*\))?$",
    )
    .expect("CAN-ID header pattern")
});

fn is_can_id_header(name: &str) -> bool {
    CAN_ID_HEADER.is_match(name)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FrameHeader {
    line: usize,
    pgn: Option<usize>,
    can_id: Option<usize>,
}

fn split_fields(line: &str, delimiter: u8) -> Vec<&str> {
    line.split(char::from(delimiter))
        .map(|field| field.trim().trim_matches('"').trim())
        .collect()
}

fn find_header(lines: &[&str], delimiter: u8, search_lines: usize) -> Option<FrameHeader> {
    lines
        .iter()
        .take(search_lines)
        .enumerate()
        .find_map(|(line, text)| {
            let fields = split_fields(text, delimiter);
            let pgn = fields.iter().position(|field| is_pgn_hex_header(field));
            let can_id = fields.iter().position(|field| is_can_id_header(field));
            (pgn.is_some() || can_id.is_some()).then_some(FrameHeader { line, pgn, can_id })
        })
}

fn scan_tokens(line: &str, delimiter: u8) -> Option<u32> {
    let delimiter = char::from(delimiter);
    line.split(|c: char| c == delimiter || c.is_whitespace() || c == '#')
        .map(|token| token.trim_matches(|c: char| matches!(c, '"' | '\'' | '(' | ')')))
        .filter(|token| !token.is_empty())
        .filter_map(|token| parse_can_id(token))
        .find(|&id| id >= MIN_SCANNED_ID)
        .and_then(|id| extract_pgn(id))
        .map(|pgn| pgn.decimal)
}

/// Recovers PGNs line by line from delimited text dumps.
///
/// A header naming a hex PGN column or a CAN identifier column is searched
/// for near the top of the file. Without such a header every line is scanned
/// token by token for anything that parses as a 29-bit identifier, and the
/// result is only a guess.
pub struct RawFramesExtractor;

impl LogExtractor for RawFramesExtractor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(
        &self,
        source: &LogSource,
        config: &ExtractorConfig,
    ) -> Result<Extraction, ParserError> {
        let Some(text) = source.text.as_deref() else {
            return Err(ParserError::FormatMismatch {
                extractor: NAME,
                reason: "binary workbook has no raw text".to_string(),
            });
        };

        let lines: Vec<&str> = text.lines().collect();
        let header = find_header(&lines, source.delimiter, config.header_search_lines);
        let first_data_line = header.map_or(0, |found| found.line + 1);

        let mut stats = PgnStats::default();
        for (offset, line) in lines.iter().enumerate().skip(first_data_line) {
            if line.trim().is_empty() {
                continue;
            }
            let pgn = match header {
                Some(FrameHeader { pgn: Some(col), .. }) => split_fields(line, source.delimiter)
                    .get(col)
                    .filter(|value| !is_placeholder(value))
                    .and_then(|value| parse_hex_pgn(value)),
                Some(FrameHeader {
                    can_id: Some(col), ..
                }) => split_fields(line, source.delimiter)
                    .get(col)
                    .filter(|value| !is_placeholder(value))
                    .and_then(|value| extract_pgn(*value))
                    .map(|pgn| pgn.decimal),
                _ => scan_tokens(line, source.delimiter),
            };
            match pgn {
                Some(pgn) => stats.record(pgn),
                None => debug!(file = %source.file_name, line = offset + 1, "no PGN on line"),
            }
        }

        if header.is_none() && stats.is_empty() {
            return Err(ParserError::FormatMismatch {
                extractor: NAME,
                reason: "no PGN/CAN-ID header and no identifier tokens".to_string(),
            });
        }

        let mut extraction = Extraction::default();
        if header.is_some() {
            extraction.located_pgn_column = true;
            extraction.pgns = stats.unique_pgns.clone();
            extraction.set_stats(StatsSource::RawFrames, stats);
        } else {
            extraction.set_guess(StatsSource::RawFrames, stats);
        }
        Ok(extraction)
    }
}
