use blake3::Hasher;
use chrono::{DateTime, Utc};
use j1939_parser::{extract_log_file, ExtractionRecord, ExtractorConfig, ParserAttempt};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug)]
pub struct FileInput<'a> {
    pub path: &'a str,
    pub contents: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Parsed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub extractor: &'static str,
    pub message: String,
}

impl From<ParserAttempt> for AttemptReport {
    fn from(attempt: ParserAttempt) -> Self {
        Self {
            extractor: attempt.extractor,
            message: attempt.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub hash: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<AttemptReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct IngestionBatch {
    pub records: Vec<ExtractionRecord>,
    pub reports: Vec<FileReport>,
    pub errors: Vec<FileError>,
    pub processed_at: DateTime<Utc>,
}

impl IngestionBatch {
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Parses each file on its own. A file that cannot be opened is reported in
/// `errors` and the rest of the batch carries on.
pub fn ingest_files(inputs: &[FileInput<'_>], config: &ExtractorConfig) -> IngestionBatch {
    let mut records = Vec::new();
    let mut reports = Vec::new();
    let mut errors = Vec::new();

    for input in inputs {
        let hash = compute_hash(input.contents);
        match extract_log_file(input.contents, input.path, config) {
            Ok(mut record) => {
                info!(
                    file = input.path,
                    vehicle = %record.vehicle_name,
                    pgns = record.pgns.len(),
                    spns = record.spn_occurrences.len(),
                    "Extracted log file"
                );
                let attempts = std::mem::take(&mut record.attempts)
                    .into_iter()
                    .map(AttemptReport::from)
                    .collect();
                reports.push(FileReport {
                    file_name: input.path.to_string(),
                    hash,
                    status: FileStatus::Parsed,
                    error: None,
                    attempts,
                });
                records.push(record);
            }
            Err(err) => {
                warn!(file = input.path, error = %err, "Skipping file");
                let message = err.to_string();
                errors.push(FileError {
                    file_name: input.path.to_string(),
                    message: message.clone(),
                });
                reports.push(FileReport {
                    file_name: input.path.to_string(),
                    hash,
                    status: FileStatus::Failed,
                    error: Some(message),
                    attempts: Vec::new(),
                });
            }
        }
    }

    IngestionBatch {
        records,
        reports,
        errors,
        processed_at: Utc::now(),
    }
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
