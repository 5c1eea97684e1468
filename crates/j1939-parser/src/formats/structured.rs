use tracing::debug;

use crate::config::ExtractorConfig;
use crate::errors::ParserError;
use crate::formats::common::{
    find_column, header_key, is_pgn_hex_header, parse_hex_pgn, parse_int_cell, parse_spn_cell,
    scan_metadata, DESCRIPTION_ALIASES, INDEX_ALIASES, PGN_ALIASES, SPN_ALIASES,
};
use crate::model::{Extraction, PgnStats, SpnKey, SpnObservation, StatsSource};
use crate::registry::LogExtractor;
use crate::source::LogSource;
use crate::tabular::Tabular;

const NAME: &str = "structured_columns";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ColumnRoles {
    index: Option<usize>,
    pgn_hex: Option<usize>,
    description: Option<usize>,
    pgn: Option<usize>,
    spn: Option<usize>,
}

impl ColumnRoles {
    fn detect(headers: &[String]) -> Self {
        let index = headers
            .iter()
            .position(|name| INDEX_ALIASES.contains(&header_key(name).as_str()));
        let pgn_hex = headers
            .iter()
            .enumerate()
            .find(|(idx, name)| Some(*idx) != index && is_pgn_hex_header(name))
            .map(|(idx, _)| idx);
        let description = find_column(headers, DESCRIPTION_ALIASES, &[index, pgn_hex]);
        let pgn = find_column(headers, PGN_ALIASES, &[index, pgn_hex, description]);
        let spn = find_column(headers, SPN_ALIASES, &[index, pgn_hex, description, pgn]);
        Self {
            index,
            pgn_hex,
            description,
            pgn,
            spn,
        }
    }

    fn has_identifiers(&self) -> bool {
        self.pgn_hex.is_some() || self.pgn.is_some() || self.spn.is_some()
    }
}

/// Reads header-named PGN / SPN / description columns row by row.
///
/// Vendor exports list one message row (with an Index) followed by its SPN
/// detail rows, so SPN rows without a PGN inherit the last PGN seen and only
/// Index-bearing rows count as messages.
pub struct StructuredColumnsExtractor;

impl LogExtractor for StructuredColumnsExtractor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract(
        &self,
        source: &LogSource,
        config: &ExtractorConfig,
    ) -> Result<Extraction, ParserError> {
        if source.tables.is_empty() {
            return Err(ParserError::FormatMismatch {
                extractor: NAME,
                reason: "no tabular content".to_string(),
            });
        }

        let mut extraction = Extraction::default();
        let mut totals: Option<(StatsSource, PgnStats)> = None;
        let mut matched_any = false;
        for table in &source.tables {
            scan_metadata(table.as_ref(), config, &mut extraction);
            let roles = ColumnRoles::detect(table.column_names());
            if !roles.has_identifiers() {
                debug!(table = table.name(), "no PGN or SPN columns");
                continue;
            }
            matched_any = true;
            let (stats_source, stats) = extract_table(table.as_ref(), roles, config, &mut extraction);
            add_table_stats(&mut totals, stats_source, stats);
        }
        if let Some((stats_source, stats)) = totals {
            extraction.set_stats(stats_source, stats);
        }

        if !matched_any && extraction.vehicle_name.is_none() && extraction.brand.is_none() {
            return Err(ParserError::FormatMismatch {
                extractor: NAME,
                reason: "no PGN, SPN or vehicle columns found".to_string(),
            });
        }
        Ok(extraction)
    }
}

fn extract_table(
    table: &dyn Tabular,
    roles: ColumnRoles,
    config: &ExtractorConfig,
    into: &mut Extraction,
) -> (StatsSource, PgnStats) {
    if roles.pgn_hex.is_some() || roles.pgn.is_some() {
        into.located_pgn_column = true;
    }

    let mut stats = PgnStats::default();
    let mut current_pgn: Option<u32> = None;

    for row in 0..table.row_count() {
        let is_main_row = roles.index.map_or(true, |col| table.cell(row, col).is_some());

        let hex_pgn = roles
            .pgn_hex
            .and_then(|col| table.cell(row, col))
            .and_then(|text| parse_hex_pgn(&text));
        let row_pgn = hex_pgn.or_else(|| {
            roles
                .pgn
                .and_then(|col| table.cell(row, col))
                .and_then(|text| parse_int_cell(&text))
                .filter(|&value| config.is_plausible_pgn(value))
                .and_then(|value| u32::try_from(value).ok())
        });

        if let Some(pgn) = row_pgn {
            into.pgns.insert(pgn);
            current_pgn = Some(pgn);
            if is_main_row {
                stats.record(pgn);
            }
        }

        let Some(spn_text) = roles.spn.and_then(|col| table.cell(row, col)) else {
            continue;
        };
        let Some((spn, value)) = parse_spn_cell(&spn_text) else {
            debug!(table = table.name(), row, cell = %spn_text, "skipping unparseable SPN cell");
            continue;
        };
        let description = roles
            .description
            .and_then(|col| table.cell(row, col))
            .unwrap_or_default();
        into.insert_spn(
            SpnKey::new(current_pgn, spn),
            SpnObservation { description, value },
        );
    }

    let source = if roles.index.is_some() {
        StatsSource::IndexedMessages
    } else {
        StatsSource::StructuredColumns
    };
    (source, stats)
}

// Labelled with the most trusted contributing source.
fn add_table_stats(
    totals: &mut Option<(StatsSource, PgnStats)>,
    source: StatsSource,
    stats: PgnStats,
) {
    if stats.is_empty() {
        return;
    }
    match totals {
        Some((current, sum)) => {
            *current = (*current).max(source);
            sum.total_pgn_messages += stats.total_pgn_messages;
            sum.unique_pgns.extend(stats.unique_pgns);
        }
        None => *totals = Some((source, stats)),
    }
}
