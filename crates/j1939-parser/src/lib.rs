pub mod can_id;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod formats;
pub mod model;
mod registry;
pub mod source;
pub mod tabular;

pub use can_id::{extract_pgn, parse_can_id, CanIdInput, PgnId, MAX_CAN_ID};
pub use config::{ExtractorConfig, KnownBrand};
pub use encoding::{detect_and_decode, detect_and_decode_with, DecodedText, FallbackPolicy};
pub use errors::{ParserAttempt, ParserError};
pub use model::{
    Extraction, ExtractionRecord, PgnStats, SpnEntry, SpnKey, SpnObservation, StatsSource,
};
pub use registry::{
    all_extractors, extract_dataframe, extract_log_file, extract_with_extractors, LogExtractor,
};
pub use source::LogSource;
pub use tabular::{FrameTable, SheetTable, Tabular, TextTable};

#[cfg(test)]
mod tests;
