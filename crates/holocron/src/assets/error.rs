use super::AssetKind;
use holocron_content::ContentError;
use holocron_gob::GobError;
use thiserror::Error;

pub type AssetResult<T> = Result<T, AssetError>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Archive(#[from] GobError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("{0:?} assets can't be loaded on their own")]
    UnsupportedAssetKind(AssetKind),
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::Archive(GobError::NotFound(_)))
    }
}
