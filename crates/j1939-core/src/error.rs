// crates/j1939-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No parameter definition for SPN {0}")]
    DefinitionNotFound(u32),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Master table line {line}: {message}")]
    MasterRow { line: u64, message: String },

    #[error("Log parsing failed: {0}")]
    Parser(#[from] j1939_parser::ParserError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
