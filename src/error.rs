//! Error types for gbtools

use thiserror::Error;

/// Result type alias for gbtools operations
pub type Result<T> = std::result::Result<T, GbToolsError>;

/// Main error type for gbtools
#[derive(Error, Debug)]
pub enum GbToolsError {
    /// IO errors, including truncated input
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not look like a GenBank file, or a record header is malformed
    #[error("GenBank parse error: {0}")]
    Parsing(String),

    /// A feature location string could not be parsed
    #[error("invalid location '{text}': {message}")]
    Location { text: String, message: String },

    /// Qualifier lookup on a feature that does not carry it
    #[error("{key} is not a qualifier for {feature}")]
    MissingQualifier { key: String, feature: String },

    /// Locus lookup by position or name failed
    #[error("Locus not found: {0}")]
    LocusNotFound(String),

    /// FASTA or FASTA index errors
    #[error("FASTA error: {0}")]
    Fasta(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File not found errors
    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl GbToolsError {
    pub(crate) fn location(text: &str, message: impl Into<String>) -> Self {
        GbToolsError::Location {
            text: text.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GbToolsError {
    fn from(err: serde_json::Error) -> Self {
        GbToolsError::Serialization(err.to_string())
    }
}
