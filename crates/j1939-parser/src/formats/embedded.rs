use crate::config::ExtractorConfig;
use crate::errors::ParserError;
use crate::model::{Extraction, PgnStats, SpnObservation, StatsSource};
use crate::registry::LogExtractor;
use crate::source::LogSource;

const NAME: &str = "embedded_cells";

// `SPN: 190 2200RPM`, `spn=190 2200`
fn labelled_spn(cell: &str) -> Option<(u32, Option<String>)> {
    if !cell.to_lowercase().contains("spn") {
        return None;
    }
    let spaced = cell.replace([':', '='], " ");
    let parts: Vec<&str> = spaced.split_whitespace().collect();
    parts.iter().enumerate().find_map(|(idx, part)| {
        if !part.to_lowercase().starts_with("spn") {
            return None;
        }
        let spn = parts.get(idx + 1)?.parse::<u32>().ok()?;
        let value = parts.get(idx + 2).map(|value| value.to_string());
        Some((spn, value))
    })
}

fn bare_pgn(cell: &str, config: &ExtractorConfig) -> Option<u32> {
    let value = cell.trim().parse::<i64>().ok()?;
    if !config.is_plausible_pgn(value) {
        return None;
    }
    u32::try_from(value).ok()
}

/// Scans every data cell for labelled SPNs, and optionally for bare integers
/// that may be PGNs.
///
/// Bare integers are reported as a guess. They are only kept when no other
/// extractor located a PGN or CAN-ID column, since in a structured sheet
/// they are usually SPNs or row numbers.
pub struct EmbeddedCellsExtractor;

impl LogExtractor for EmbeddedCellsExtractor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(
        &self,
        source: &LogSource,
        config: &ExtractorConfig,
    ) -> Result<Extraction, ParserError> {
        let mut extraction = Extraction::default();
        let mut guessed = PgnStats::default();

        for table in &source.tables {
            for col in 0..table.column_count() {
                for row in 0..table.row_count() {
                    let Some(cell) = table.cell(row, col) else {
                        continue;
                    };
                    if let Some((spn, value)) = labelled_spn(&cell) {
                        let observation = SpnObservation {
                            description: String::new(),
                            value,
                        };
                        extraction.insert_unkeyed_spn(spn, observation);
                    }
                    if config.embedded_integer_pgns {
                        if let Some(pgn) = bare_pgn(&cell, config) {
                            guessed.record(pgn);
                        }
                    }
                }
            }
        }

        if extraction.spns.is_empty() && guessed.is_empty() {
            return Err(ParserError::FormatMismatch {
                extractor: NAME,
                reason: "no labelled SPN or integer cells".to_string(),
            });
        }
        extraction.set_guess(StatsSource::EmbeddedCells, guessed);
        Ok(extraction)
    }
}
