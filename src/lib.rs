//! `feature_cache` resolves which time-bounded feature (an expedition, a
//! deployment) a platform was part of at a given moment.
//!
//! Feature windows are indexed per platform in an [`IntervalTree`], an AVL
//! tree augmented with the maximum upper bound of each subtree, giving
//! O(log n) insertion and O(log n + k) overlap search.
//!
//! The tree stores its nodes in a vector and links parents and children by
//! index rather than by pointer. Rotations can then walk upwards through
//! parent links without reference cycles, and the tree stays `Send` and
//! `Sync` for sharing across threads.
//!
//! A [`FeatureCache`] serves one immutable [`Snapshot`] of all platforms at a
//! time and swaps in a freshly built one on every refresh, either once at
//! startup or periodically via a [`RefreshScheduler`].
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use feature_cache::{FeatureCache, FeatureRecord, SourceError};
//!
//! fn load() -> Result<Vec<FeatureRecord>, SourceError> {
//!     Ok(vec![FeatureRecord::new(
//!         "polarstern",
//!         Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
//!         Utc.with_ymd_and_hms(2010, 1, 10, 0, 0, 0).unwrap(),
//!         "cruise1",
//!     )])
//! }
//!
//! let cache = FeatureCache::new(load);
//! cache.refresh().unwrap();
//! let t = Utc.with_ymd_and_hms(2010, 1, 5, 0, 0, 0).unwrap();
//! assert_eq!(cache.get_feature_id("polarstern", &t), "cruise1");
//! assert_eq!(cache.get_feature_id("unknown-ship", &t), "unknown-ship");
//! ```
//!

mod cache;
mod config;
mod error;
mod index;
mod interval;
mod iter;
mod node;
mod point;
mod scheduler;
mod snapshot;
mod source;
mod tree;


pub use cache::{FeatureCache, RefreshStats};
pub use config::{CacheConfig, DEFAULT_THREAD_NAME};
pub use error::{CacheError, Result};
pub use interval::{Interval, IntervalError};
pub use iter::Iter;
pub use point::Point;
pub use scheduler::{RefreshMode, RefreshScheduler};
pub use snapshot::{FeatureRecord, Snapshot, Timestamp};
pub use source::{FeatureSource, SourceError};
pub use tree::IntervalTree;
