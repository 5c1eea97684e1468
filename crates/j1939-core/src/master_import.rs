//! CSV master-table uploads.
//!
//! Headers are matched case-insensitively against the canonical column set
//! plus a few relaxed aliases. Missing optional columns fall back to a
//! single unscaled byte at the start of the payload.

use csv::{ReaderBuilder, StringRecord, Trim};
use j1939_parser::detect_and_decode;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::parameters::{normalize_pgn_hex, ParameterDefinition, ParameterTable, UpsertOutcome};

const SPN: &[&str] = &["spn_number", "spn"];
const PGN_DEC: &[&str] = &["pgn_dec", "pgn"];
const PGN_HEX: &[&str] = &["pgn_hex", "pgn(h)"];
const DESCRIPTION: &[&str] = &["spn_description", "description"];
const UNIT: &[&str] = &["unit"];
const DATA_LENGTH: &[&str] = &["data_length_bytes", "data_length"];
const START_BYTE: &[&str] = &["start_byte"];
const START_BIT: &[&str] = &["start_bit"];
const BIT_LENGTH: &[&str] = &["bit_length"];
const RESOLUTION: &[&str] = &["resolution"];
const OFFSET: &[&str] = &["offset"];
const MIN_VALUE: &[&str] = &["min_value"];
const MAX_VALUE: &[&str] = &["max_value"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<RowIssue>,
}

/// Rows read from a master CSV, before they touch a table.
#[derive(Debug, Default)]
pub struct MasterRows {
    pub definitions: Vec<ParameterDefinition>,
    pub skipped: Vec<RowIssue>,
}

/// Parses `bytes` and upserts every usable row into `table`.
pub fn import_master_csv(bytes: &[u8], table: &ParameterTable) -> Result<ImportReport> {
    let rows = parse_master_csv(bytes)?;
    let mut report = ImportReport {
        skipped: rows.skipped,
        ..ImportReport::default()
    };
    for definition in rows.definitions {
        match table.upsert(definition) {
            UpsertOutcome::Created => report.created += 1,
            UpsertOutcome::Updated => report.updated += 1,
        }
    }
    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped.len(),
        "Imported master parameter table"
    );
    Ok(report)
}

pub fn parse_master_csv(bytes: &[u8]) -> Result<MasterRows> {
    let decoded = detect_and_decode(bytes);
    let text = decoded.text.trim_start_matches('\u{FEFF}');
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = Columns::locate(reader.headers()?)?;
    let mut rows = MasterRows::default();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        match columns.definition(&record) {
            Ok(definition) => rows.definitions.push(definition),
            Err(message) => {
                debug!(line, message = %message, "skipping master row");
                rows.skipped.push(RowIssue { line, message });
            }
        }
    }
    Ok(rows)
}

/// Column positions resolved from the header row.
struct Columns {
    spn: usize,
    pgn_dec: Option<usize>,
    pgn_hex: Option<usize>,
    description: Option<usize>,
    unit: Option<usize>,
    data_length: Option<usize>,
    start_byte: Option<usize>,
    start_bit: Option<usize>,
    bit_length: Option<usize>,
    resolution: Option<usize>,
    offset: Option<usize>,
    min_value: Option<usize>,
    max_value: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let keys: Vec<String> = headers
            .iter()
            .map(|header| header.trim().to_lowercase())
            .collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| keys.iter().position(|key| key == alias))
        };

        let spn = find(SPN).ok_or_else(|| CoreError::MasterRow {
            line: 1,
            message: "header has no SPN_Number or SPN column".to_string(),
        })?;
        Ok(Self {
            spn,
            pgn_dec: find(PGN_DEC),
            pgn_hex: find(PGN_HEX),
            description: find(DESCRIPTION),
            unit: find(UNIT),
            data_length: find(DATA_LENGTH),
            start_byte: find(START_BYTE),
            start_bit: find(START_BIT),
            bit_length: find(BIT_LENGTH),
            resolution: find(RESOLUTION),
            offset: find(OFFSET),
            min_value: find(MIN_VALUE),
            max_value: find(MAX_VALUE),
        })
    }

    fn definition(&self, record: &StringRecord) -> std::result::Result<ParameterDefinition, String> {
        let field = |index: Option<usize>| {
            index
                .and_then(|index| record.get(index))
                .filter(|value| !value.is_empty())
        };

        let spn_text = field(Some(self.spn)).ok_or("missing SPN")?;
        let spn_number = parse_whole(spn_text)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| format!("unparseable SPN {spn_text:?}"))?;

        let pgn_decimal = match (field(self.pgn_dec), field(self.pgn_hex)) {
            (Some(value), _) => parse_pgn(value),
            (None, Some(hex)) => u32::from_str_radix(&normalize_pgn_hex(hex), 16).ok(),
            (None, None) => None,
        }
        .ok_or_else(|| format!("SPN {spn_number} has no usable PGN"))?;
        let pgn_hex = field(self.pgn_hex)
            .map(normalize_pgn_hex)
            .unwrap_or_else(|| format!("{pgn_decimal:04X}"));

        let data_length_bytes = small_int(field(self.data_length), "Data_Length_Bytes")?;
        let bit_length = small_int(field(self.bit_length), "Bit_Length")?;
        let (data_length_bytes, bit_length) = match (data_length_bytes, bit_length) {
            (Some(bytes), Some(bits)) => (bytes, bits),
            (Some(bytes), None) => (bytes, bytes.saturating_mul(8)),
            (None, Some(bits)) => (bits.div_ceil(8).max(1), bits),
            (None, None) => (1, 8),
        };

        Ok(ParameterDefinition {
            spn_number,
            pgn_decimal,
            pgn_hex,
            description: field(self.description).unwrap_or_default().to_string(),
            unit: field(self.unit).unwrap_or_default().to_string(),
            data_length_bytes,
            start_byte: start_byte(field(self.start_byte))?.unwrap_or(1),
            start_bit: small_int(field(self.start_bit), "Start_Bit")?.unwrap_or(0),
            bit_length,
            resolution: float(field(self.resolution), "Resolution")?.unwrap_or(1.0),
            offset: float(field(self.offset), "Offset")?.unwrap_or(0.0),
            min_value: float(field(self.min_value), "Min_Value")?,
            max_value: float(field(self.max_value), "Max_Value")?,
        })
    }
}

/// Integer text, tolerating the `84.0` spreadsheets write for whole numbers.
fn parse_whole(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && value.fract() == 0.0)
            .map(|value| value as i64)
    })
}

/// Decimal when it parses as one, otherwise hex.
fn parse_pgn(text: &str) -> Option<u32> {
    parse_whole(text)
        .and_then(|value| u32::try_from(value).ok())
        .or_else(|| u32::from_str_radix(&normalize_pgn_hex(text), 16).ok())
}

fn small_int(text: Option<&str>, column: &str) -> std::result::Result<Option<u8>, String> {
    text.map(|text| {
        parse_whole(text)
            .and_then(|value| u8::try_from(value).ok())
            .ok_or_else(|| format!("{column} value {text:?} is not a small integer"))
    })
    .transpose()
}

/// `Start_Byte` may be a bare byte or a `start-end` range; only the start
/// is kept.
fn start_byte(text: Option<&str>) -> std::result::Result<Option<u8>, String> {
    let start = text.map(|text| text.split('-').next().unwrap_or(text).trim());
    small_int(start, "Start_Byte")
}

fn float(text: Option<&str>, column: &str) -> std::result::Result<Option<f64>, String> {
    text.map(|text| {
        text.parse::<f64>()
            .map_err(|_| format!("{column} value {text:?} is not a number"))
    })
    .transpose()
}
