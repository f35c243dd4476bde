use std::io;

use thiserror::Error;

use crate::source::SourceError;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by refreshing or scheduling a `FeatureCache`.
///
/// Readers of the cache never see these; a failed refresh keeps the
/// previous snapshot in service.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("feature source fetch failed: {0}")]
    DataSource(#[source] SourceError),
    #[error("refresh panicked: {message}")]
    RefreshPanicked { message: String },
    #[error("failed to spawn refresh worker: {0}")]
    Spawn(#[source] io::Error),
}
