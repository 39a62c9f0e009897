use crate::AnyResult;
use anyhow::anyhow;
use std::{error::Error, fmt::Display};

/// Attaches a human readable message to a failed result, turning it into an [`anyhow::Error`].
pub trait AnyhowResultExt<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> AnyhowResultExt<T> for Result<T, E> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.map_err(|e| anyhow::Error::from(e).context(s.to_string()))
    }
}

impl<T> AnyhowResultExt<T> for Option<T> {
    fn otherwise(self, s: impl Display) -> AnyResult<T> {
        self.ok_or_else(|| anyhow!("{s}"))
    }
}
