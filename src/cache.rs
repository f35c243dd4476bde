//! The shared, swappable feature cache.
//!
//! Readers clone the current `Arc<Snapshot>` under a read lock and answer
//! from it; `refresh` builds the next snapshot without holding any reader
//! lock and swaps it in under a brief write lock. Both maps of a snapshot
//! therefore always come from the same batch.

use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{info, warn};
use parking_lot::{Mutex, RwLock};

use crate::error::{CacheError, Result};
use crate::snapshot::{Snapshot, Timestamp};
use crate::source::FeatureSource;

/// Counters describing the refresh history of a cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Refreshes started.
    pub attempts: u64,
    /// Refreshes that swapped in a new snapshot.
    pub successes: u64,
    /// Refreshes that left the previous snapshot in place.
    pub failures: u64,
    /// Failures since the last success.
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Resolves platform features from the latest snapshot pulled from `S`.
pub struct FeatureCache<S> {
    source: S,
    snapshot: RwLock<Arc<Snapshot>>,
    /// Held for the whole of a refresh; guards the last published generation.
    generation: Mutex<u64>,
    stats: Mutex<RefreshStats>,
}

impl<S: FeatureSource> FeatureCache<S> {
    /// Creates a cache serving an empty snapshot until the first refresh.
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            generation: Mutex::new(0),
            stats: Mutex::new(RefreshStats::default()),
        }
    }

    /// Pull a fresh batch from the source and replace the served snapshot.
    ///
    /// On error the previous snapshot stays in service. Concurrent calls run
    /// one after another.
    pub fn refresh(&self) -> Result<()> {
        let mut generation = self.generation.lock();
        let started = Instant::now();
        self.stats.lock().attempts += 1;

        let records = match self.source.fetch() {
            Ok(records) => records,
            Err(err) => {
                let err = CacheError::DataSource(err);
                self.record_failure(&err);
                return Err(err);
            }
        };

        let next = Snapshot::build(records, *generation + 1);
        let groups = next.groups().len();
        let count = next.record_count();
        let dropped = next.dropped();

        drop(self.publish(next));
        *generation += 1;

        {
            let mut stats = self.stats.lock();
            stats.successes += 1;
            stats.consecutive_failures = 0;
            stats.last_success = Some(Utc::now());
        }

        info!(
            "feature cache generation {} loaded: {} groups, {} records ({} dropped) in {:?}",
            *generation,
            groups,
            count,
            dropped,
            started.elapsed()
        );
        Ok(())
    }

    /// Resolve the feature active for `group` at `time`, falling back to
    /// `group` itself.
    pub fn get_feature_id(&self, group: &str, time: &Timestamp) -> String {
        self.snapshot().feature_id(group, time)
    }

    /// Every feature known for `group`, or `{group}` when there is none.
    pub fn get_feature_ids(&self, group: &str) -> BTreeSet<String> {
        self.snapshot().feature_ids(group)
    }

    /// Features of `group` active at some point strictly inside
    /// `[start, end]`, or `{group}` when there is none.
    pub fn get_feature_ids_between(
        &self,
        group: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> BTreeSet<String> {
        self.snapshot().feature_ids_between(group, start, end)
    }

    /// Every group in the served snapshot, sorted.
    pub fn groups(&self) -> Vec<String> {
        self.snapshot()
            .groups()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}

impl<S> FeatureCache<S> {
    /// The snapshot currently served.
    ///
    /// Holding the returned `Arc` pins that generation; use it to answer
    /// several queries from one consistent view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Generation of the served snapshot, `0` before the first refresh.
    pub fn generation(&self) -> u64 {
        self.snapshot.read().generation()
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats.lock().clone()
    }

    /// Swap `next` in and hand back the snapshot it replaced.
    ///
    /// The write lock covers only the pointer swap; the previous generation
    /// is freed by the caller once the guard is gone.
    fn publish(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        mem::replace(&mut *self.snapshot.write(), next)
    }

    pub(crate) fn record_failure(&self, err: &CacheError) {
        let mut stats = self.stats.lock();
        stats.failures += 1;
        stats.consecutive_failures += 1;
        stats.last_error = Some(err.to_string());
        warn!(
            "feature cache refresh failed ({} in a row), serving generation {}: {}",
            stats.consecutive_failures,
            self.snapshot.read().generation(),
            err
        );
    }
}

#[cfg(test)]
mod test {
    use std::result::Result;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use chrono::TimeZone;

    use super::*;
    use crate::snapshot::FeatureRecord;
    use crate::source::SourceError;

    fn ts(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn ids(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn polarstern() -> Result<Vec<FeatureRecord>, SourceError> {
        Ok(vec![
            FeatureRecord::new("polarstern", ts(2010, 1, 1), ts(2010, 1, 10), "cruise1"),
            FeatureRecord::new("polarstern", ts(2010, 2, 1), ts(2010, 2, 5), "cruise2"),
            FeatureRecord::new("x", ts(2010, 5, 10), ts(2010, 5, 1), "bad"),
        ])
    }

    #[test]
    fn empty_cache_answers_with_fallbacks() {
        let cache = FeatureCache::new(polarstern);
        assert_eq!(cache.generation(), 0);
        assert!(cache.snapshot().is_empty());
        assert_eq!(
            cache.get_feature_id("polarstern", &ts(2010, 1, 5)),
            "polarstern"
        );
        assert_eq!(cache.get_feature_ids("polarstern"), ids(&["polarstern"]));
        assert!(cache.groups().is_empty());
    }

    #[test]
    fn refresh_serves_new_snapshot() {
        let cache = FeatureCache::new(polarstern);
        cache.refresh().unwrap();
        assert_eq!(cache.generation(), 1);
        assert!(!cache.snapshot().is_empty());
        assert_eq!(cache.get_feature_id("polarstern", &ts(2010, 1, 5)), "cruise1");
        assert_eq!(
            cache.get_feature_ids("polarstern"),
            ids(&["cruise1", "cruise2"])
        );
        assert_eq!(
            cache.get_feature_id("unknown-ship", &ts(2010, 1, 5)),
            "unknown-ship"
        );
        assert_eq!(cache.get_feature_ids("unknown-ship"), ids(&["unknown-ship"]));
        assert_eq!(cache.get_feature_id("x", &ts(2010, 5, 5)), "x");
        assert_eq!(cache.get_feature_ids("x"), ids(&["bad"]));
        assert_eq!(
            cache.get_feature_ids_between("polarstern", &ts(2010, 1, 20), &ts(2010, 2, 2)),
            ids(&["cruise2"])
        );
        assert_eq!(cache.groups(), vec!["polarstern".to_owned(), "x".to_owned()]);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let failing = AtomicBool::new(false);
        let batch = AtomicU64::new(0);
        let source = || -> Result<Vec<FeatureRecord>, SourceError> {
            if failing.load(Ordering::SeqCst) {
                return Err("database unavailable".into());
            }
            let n = batch.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![FeatureRecord::new(
                "polarstern",
                ts(2010, 1, 1),
                ts(2010, 1, 10),
                format!("cruise{n}"),
            )])
        };
        let cache = FeatureCache::new(source);
        cache.refresh().unwrap();
        let before = cache.snapshot();

        failing.store(true, Ordering::SeqCst);
        let err = cache.refresh().unwrap_err();
        assert!(matches!(err, CacheError::DataSource(_)));
        assert!(Arc::ptr_eq(&before, &cache.snapshot()));
        assert_eq!(cache.get_feature_id("polarstern", &ts(2010, 1, 5)), "cruise1");
        assert_eq!(cache.get_feature_ids("polarstern"), ids(&["cruise1"]));

        let stats = cache.stats();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.consecutive_failures, 1);
        assert!(stats
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("database unavailable")));

        failing.store(false, Ordering::SeqCst);
        cache.refresh().unwrap();
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.get_feature_id("polarstern", &ts(2010, 1, 5)), "cruise2");
        assert_eq!(cache.stats().consecutive_failures, 0);
        assert_eq!(cache.stats().successes, 2);
    }

    #[test]
    fn previous_snapshot_is_released_outside_the_write_lock() {
        let cache = FeatureCache::new(polarstern);
        cache.refresh().unwrap();
        let next = Snapshot::build(polarstern().unwrap(), 2);

        let previous = cache.publish(next);
        assert!(cache.snapshot.try_write().is_some());
        assert_eq!(previous.generation(), 1);
        assert_eq!(Arc::strong_count(&previous), 1);
        assert_eq!(cache.snapshot().generation(), 2);
    }

    #[test]
    fn readers_never_observe_mixed_batches() {
        let batch = AtomicU64::new(0);
        let source = || -> Result<Vec<FeatureRecord>, SourceError> {
            let n = batch.fetch_add(1, Ordering::SeqCst) + 1;
            let feature = format!("batch-{n}");
            Ok(vec![
                FeatureRecord::new("g", ts(2010, 1, 1), ts(2010, 12, 31), feature.clone()),
                FeatureRecord::new(format!("only-{n}"), ts(2010, 1, 1), ts(2010, 1, 2), feature),
            ])
        };
        let cache = FeatureCache::new(source);
        cache.refresh().unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        let snapshot = cache.snapshot();
                        let expected = format!("batch-{}", snapshot.generation());
                        assert_eq!(snapshot.feature_id("g", &ts(2010, 6, 1)), expected);
                        assert_eq!(snapshot.feature_ids("g"), BTreeSet::from([expected]));
                        assert_eq!(snapshot.groups().len(), 2);
                    }
                });
            }
            for _ in 0..50 {
                cache.refresh().unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        assert_eq!(cache.generation(), 51);
    }
}
