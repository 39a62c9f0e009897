use std::io;
use thiserror::Error;

pub type GobResult<T> = Result<T, GobError>;

#[derive(Debug, Error)]
pub enum GobError {
    #[error("cannot find `{0}` in any overlay directory or container")]
    NotFound(String),
    #[error("container `{label}` is corrupt: {reason}")]
    CorruptContainer { label: String, reason: String },
    #[error("an I/O error occurred: {0}")]
    Io(#[from] io::Error),
}

impl GobError {
    pub(crate) fn corrupt(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptContainer {
            label: label.into(),
            reason: reason.to_string(),
        }
    }
}
