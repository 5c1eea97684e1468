use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ExtractorConfig;
use crate::model::Extraction;
use crate::tabular::Tabular;

pub(crate) const PGN_ALIASES: &[&str] = &[
    "pgn",
    "pgn number",
    "pgn_no",
    "pgn_number",
    "parameter group number",
];

pub(crate) const SPN_ALIASES: &[&str] = &[
    "spn",
    "spn number",
    "spn_no",
    "spn_number",
    "suspect parameter number",
];

pub(crate) const DESCRIPTION_ALIASES: &[&str] = &["description", "desc"];

pub(crate) const INDEX_ALIASES: &[&str] = &["index"];

// `PGN(H)`, `pgn_h`, `PGN (Hex)`, `pgn-hex`
static PGN_HEX_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^pgn\s*(\(\s*h(ex)?\s*\)|[\s_-]*h(ex)?)$").expect("PGN hex header pattern")
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,6}").expect("digit run pattern"));

pub(crate) fn header_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn is_pgn_hex_header(name: &str) -> bool {
    PGN_HEX_HEADER.is_match(name.trim())
}

pub(crate) fn is_placeholder(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.is_empty() || lower == "nan" || lower == "none"
}

/// Integer cell text. Spreadsheet engines hand back `65265.0`, so a finite
/// float is truncated toward zero.
pub(crate) fn parse_int_cell(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let float = trimmed.parse::<f64>().ok()?;
    if !float.is_finite() || float.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(float.trunc() as i64)
}

pub(crate) fn parse_hex_pgn(text: &str) -> Option<u32> {
    let upper = text.trim().to_ascii_uppercase();
    let digits = upper.strip_prefix("0X").unwrap_or(&upper);
    let digits = digits.strip_suffix('H').unwrap_or(digits).trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Splits an SPN column cell into the SPN number and an optional value.
///
/// `84` gives `(84, None)`, `190: 2200 RPM` and `190=2200 RPM` give
/// `(190, Some("2200 RPM"))`. When the labelled form has no integer before the
/// separator, the first run of up to six digits is the SPN.
pub(crate) fn parse_spn_cell(text: &str) -> Option<(u32, Option<String>)> {
    let trimmed = text.trim();
    if !trimmed.contains(':') && !trimmed.contains('=') {
        let spn = parse_int_cell(trimmed).and_then(|value| u32::try_from(value).ok())?;
        return Some((spn, None));
    }

    let normalized = trimmed.replace('=', ":");
    let (head, tail) = normalized.split_once(':').unwrap_or((normalized.as_str(), ""));
    if let Ok(spn) = head.trim().parse::<u32>() {
        return Some((spn, non_empty(tail)));
    }

    let run = DIGIT_RUN.find(trimmed)?;
    let spn = run.as_str().parse::<u32>().ok()?;
    let rest = trimmed[run.end()..].trim_matches(|c: char| matches!(c, ' ' | ':' | '=' | '\t'));
    Some((spn, non_empty(rest)))
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Exact alias beats substring; claimed columns are skipped.
pub(crate) fn find_column(
    headers: &[String],
    aliases: &[&str],
    claimed: &[Option<usize>],
) -> Option<usize> {
    let free = |idx: &usize| !claimed.contains(&Some(*idx));
    let keys: Vec<String> = headers.iter().map(|name| header_key(name)).collect();

    (0..keys.len())
        .filter(free)
        .find(|&idx| aliases.contains(&keys[idx].as_str()))
        .or_else(|| {
            (0..keys.len())
                .filter(free)
                .find(|&idx| aliases.iter().any(|alias| keys[idx].contains(alias)))
        })
}

/// Vehicle name and brand come from the cell right of a matching label in the
/// top-left corner of a table. Placeholder neighbours are passed over.
pub(crate) fn scan_metadata(table: &dyn Tabular, config: &ExtractorConfig, into: &mut Extraction) {
    let rows = table.row_count().min(config.metadata_scan_rows);
    let cols = table.column_count();
    for row in 0..rows {
        for col in 0..cols.min(config.metadata_scan_cols) {
            if into.vehicle_name.is_some() && into.brand.is_some() {
                return;
            }
            let Some(label) = table.cell(row, col) else {
                continue;
            };
            let label = label.to_lowercase();
            let adjacent = || {
                if col + 1 < cols {
                    table.cell(row, col + 1).filter(|value| !is_placeholder(value))
                } else {
                    None
                }
            };

            if into.vehicle_name.is_none()
                && config.vehicle_aliases.iter().any(|alias| label.contains(alias.as_str()))
            {
                into.vehicle_name = adjacent();
            }
            if into.brand.is_none()
                && config.brand_aliases.iter().any(|alias| label.contains(alias.as_str()))
            {
                into.brand = adjacent();
            }
        }
    }
}
