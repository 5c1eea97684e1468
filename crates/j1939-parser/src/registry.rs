use std::path::Path;

use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::debug;

use crate::can_id::PgnId;
use crate::config::ExtractorConfig;
use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{EmbeddedCellsExtractor, RawFramesExtractor, StructuredColumnsExtractor};
use crate::model::{Extraction, ExtractionRecord};
use crate::source::LogSource;
use crate::tabular::FrameTable;

const UNKNOWN: &str = "Unknown";

pub trait LogExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(
        &self,
        source: &LogSource,
        config: &ExtractorConfig,
    ) -> Result<Extraction, ParserError>;
}

static EXTRACTORS: Lazy<Vec<&'static dyn LogExtractor>> = Lazy::new(|| {
    vec![
        &StructuredColumnsExtractor as &dyn LogExtractor,
        &RawFramesExtractor as &dyn LogExtractor,
        &EmbeddedCellsExtractor as &dyn LogExtractor,
    ]
});

pub fn all_extractors() -> &'static [&'static dyn LogExtractor] {
    EXTRACTORS.as_slice()
}

/// Parses one uploaded log. Only a file that cannot be opened at all is an
/// error; a file no extractor understands yields an empty record.
pub fn extract_log_file(
    bytes: &[u8],
    file_name: &str,
    config: &ExtractorConfig,
) -> Result<ExtractionRecord, ParserError> {
    let source = LogSource::load(bytes, file_name, config)?;
    Ok(extract_with_extractors(&source, config, all_extractors()))
}

/// Runs the extractors over an in-memory DataFrame.
pub fn extract_dataframe(
    df: &DataFrame,
    file_name: &str,
    config: &ExtractorConfig,
) -> PolarsResult<ExtractionRecord> {
    let table = FrameTable::new(file_name, df)?;
    let source = LogSource::from_tables(file_name, vec![Box::new(table)]);
    Ok(extract_with_extractors(&source, config, all_extractors()))
}

pub fn extract_with_extractors(
    source: &LogSource,
    config: &ExtractorConfig,
    extractors: &[&dyn LogExtractor],
) -> ExtractionRecord {
    let mut merged = Extraction::default();
    let mut attempts = source.skipped.clone();
    let mut used = Vec::new();

    for extractor in extractors {
        match extractor.extract(source, config) {
            Ok(extraction) => {
                used.push(extractor.name());
                merged.merge(extraction);
            }
            Err(err) => {
                debug!(
                    file = %source.file_name,
                    extractor = extractor.name(),
                    error = %err,
                    "extractor declined"
                );
                let message = match err {
                    ParserError::FormatMismatch { reason, .. } => reason,
                    other => other.to_string(),
                };
                attempts.push(ParserAttempt::new(extractor.name(), message));
            }
        }
    }

    if merged.located_pgn_column {
        merged.guessed = None;
    } else {
        merged.adopt_guess();
    }

    build_record(source, config, merged, used, attempts)
}

fn build_record(
    source: &LogSource,
    config: &ExtractorConfig,
    merged: Extraction,
    extractors: Vec<&'static str>,
    attempts: Vec<ParserAttempt>,
) -> ExtractionRecord {
    let vehicle_name = merged
        .vehicle_name
        .or_else(|| file_stem(&source.file_name))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let brand = merged
        .brand
        .or_else(|| config.brand_from_filename(&source.file_name).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let (stats_source, stats) = match merged.stats {
        Some((source, stats)) => (Some(source), stats),
        None => (None, Default::default()),
    };

    ExtractionRecord {
        source_file: source.file_name.clone(),
        vehicle_name,
        brand,
        encoding: source.encoding.map(str::to_string),
        pgns: merged.pgns,
        spn_occurrences: merged.spns,
        total_pgn_messages: stats.total_pgn_messages,
        unique_pgn_count: stats.unique_pgn_count(),
        unique_pgn_list: stats.unique_pgns.iter().copied().map(PgnId::new).collect(),
        stats_source,
        extractors,
        attempts,
    }
}

fn file_stem(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}
