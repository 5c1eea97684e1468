use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ParserAttempt {
    pub extractor: &'static str,
    pub message: String,
}

impl ParserAttempt {
    pub fn new(extractor: &'static str, message: impl Into<String>) -> Self {
        Self {
            extractor,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParserAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.extractor, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{extractor} not applicable: {reason}")]
    FormatMismatch {
        extractor: &'static str,
        reason: String,
    },

    #[error("{extractor} CSV error: {source}")]
    Csv {
        extractor: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("failed to open workbook '{file_name}': {source}")]
    Workbook {
        file_name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet '{sheet}' in '{file_name}' could not be read: {message}")]
    Sheet {
        file_name: String,
        sheet: String,
        message: String,
    },

    #[error("invalid extractor configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}
