use std::io;
use thiserror::Error;

pub type ContentResult<T> = Result<T, ContentError>;

/// Failure while parsing a single content file. Every variant names the file.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("`{file}` line {line}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },
    #[error("`{file}` is corrupt: {reason}")]
    CorruptAsset { file: String, reason: String },
    #[error("`{file}` uses an unsupported format: {reason}")]
    UnsupportedFormat { file: String, reason: String },
    #[error("`{file}` has a broken reference: {reason}")]
    ReferenceError { file: String, reason: String },
    #[error("an I/O error occurred while reading `{file}`: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
}

impl ContentError {
    pub fn corrupt(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptAsset {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnsupportedFormat {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn reference(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReferenceError {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(file: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }

    /// Name of the file the error refers to
    pub fn file(&self) -> &str {
        match self {
            Self::MalformedRecord { file, .. }
            | Self::CorruptAsset { file, .. }
            | Self::UnsupportedFormat { file, .. }
            | Self::ReferenceError { file, .. }
            | Self::Io { file, .. } => file,
        }
    }
}
