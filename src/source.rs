//! Boundary to the external store that yields raw feature intervals.

use std::error::Error;

use crate::snapshot::FeatureRecord;

/// Error type returned by a [`FeatureSource`].
pub type SourceError = Box<dyn Error + Send + Sync + 'static>;

/// Supplies the full batch of feature intervals a snapshot is built from.
///
/// `fetch` is called synchronously from `FeatureCache::refresh`, on whatever
/// thread drives the refresh.
pub trait FeatureSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<FeatureRecord>, SourceError>;
}

impl<F> FeatureSource for F
where
    F: Fn() -> Result<Vec<FeatureRecord>, SourceError> + Send + Sync,
{
    fn fetch(&self) -> Result<Vec<FeatureRecord>, SourceError> {
        self()
    }
}
