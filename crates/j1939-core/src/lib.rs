pub mod aggregate;
pub mod decoder;
pub mod error;
pub mod ingestion;
pub mod master_import;
pub mod parameters;
pub mod seed;
pub mod standard_map;

pub use aggregate::{Aggregator, MappedSpnDetail, Summary, VehicleStandardSummary};
pub use decoder::{decode, DecodeResult, DecodeStatus, PAYLOAD_LEN};
pub use error::{CoreError, Result};
pub use ingestion::{ingest_files, FileError, FileInput, FileReport, FileStatus, IngestionBatch};
pub use master_import::{import_master_csv, parse_master_csv, ImportReport, RowIssue};
pub use parameters::{normalize_pgn_hex, ParameterDefinition, ParameterTable, UpsertOutcome};
pub use seed::{builtin_definitions, seed, SeedReport};
pub use standard_map::{StandardMap, StandardSummary};
