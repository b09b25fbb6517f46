use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Invalid secret key")]
    Unauthorized,
    #[error("URLs not provided")]
    MissingUrls,
    #[error("Invalid URL: {0:?}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("storage failure at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }

    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            CatalogError::NotFound(path.display().to_string())
        } else {
            CatalogError::Storage { path, source }
        }
    }
}
