//! One immutable generation of the feature cache, built from a batch of raw
//! feature records.
//!
//! A snapshot holds two maps derived from the same batch:
//! - per group, an [`IntervalTree`] from time window to feature id
//! - per group, the set of every feature id named by the batch
//!
//! Records whose window is inverted are left out of the tree but still
//! contribute their feature id to the group's id set.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use log::debug;

use crate::interval::{Interval, IntervalError};
use crate::tree::IntervalTree;

pub type Timestamp = DateTime<Utc>;

/// A raw `(group, lower, upper, feature id)` tuple as delivered by a
/// `FeatureSource`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureRecord {
    /// Platform the feature belongs to
    pub group: String,
    /// Start of the feature's window, inclusive
    pub lower: Timestamp,
    /// End of the feature's window, inclusive
    pub upper: Timestamp,
    /// Identifier of the feature
    pub feature_id: String,
}

impl FeatureRecord {
    pub fn new(
        group: impl Into<String>,
        lower: Timestamp,
        upper: Timestamp,
        feature_id: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            lower,
            upper,
            feature_id: feature_id.into(),
        }
    }

    /// The record's window, if its bounds are ordered.
    pub fn interval(&self) -> Result<Interval<Timestamp>, IntervalError> {
        Interval::new(self.lower, self.upper)
    }
}

/// An immutable, internally consistent view of every group's features.
#[derive(Debug, Default)]
pub struct Snapshot {
    by_time: HashMap<String, IntervalTree<Timestamp, String>>,
    by_platform: HashMap<String, BTreeSet<String>>,
    generation: u64,
    records: usize,
    dropped: usize,
}

impl Snapshot {
    /// The snapshot served before the first refresh completes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from a batch of records.
    ///
    /// Records are inserted in batch order, so for two records with the same
    /// group and identical window the first one wins.
    ///
    /// # Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use feature_cache::{FeatureRecord, Snapshot};
    ///
    /// let day = |d| Utc.with_ymd_and_hms(2010, 1, d, 0, 0, 0).unwrap();
    /// let snapshot = Snapshot::build(
    ///     vec![FeatureRecord::new("polarstern", day(1), day(10), "cruise1")],
    ///     1,
    /// );
    /// assert_eq!(snapshot.feature_id("polarstern", &day(5)), "cruise1");
    /// assert_eq!(snapshot.feature_id("unknown-ship", &day(5)), "unknown-ship");
    /// ```
    pub fn build<I>(records: I, generation: u64) -> Self
    where
        I: IntoIterator<Item = FeatureRecord>,
    {
        let mut by_time: HashMap<String, IntervalTree<Timestamp, String>> = HashMap::new();
        let mut by_platform: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut count = 0;
        let mut dropped = 0;

        for record in records {
            count += 1;
            let _ignore = by_platform
                .entry(record.group.clone())
                .or_default()
                .insert(record.feature_id.clone());

            let FeatureRecord {
                group,
                lower,
                upper,
                feature_id,
            } = record;
            match Interval::new(lower, upper) {
                Ok(interval) => {
                    let _ignore = by_time.entry(group).or_default().insert(interval, feature_id);
                }
                Err(err) => {
                    dropped += 1;
                    debug!("dropping feature {feature_id} of {group} [{lower}, {upper}]: {err}");
                }
            }
        }

        Self {
            by_time,
            by_platform,
            generation,
            records: count,
            dropped,
        }
    }

    /// Resolve the feature active for `group` at `time`.
    ///
    /// Falls back to `group` itself when the group is unknown or has no
    /// valid windows.
    pub fn feature_id(&self, group: &str, time: &Timestamp) -> String {
        self.by_time
            .get(group)
            .and_then(|tree| tree.lookup_nearest(time))
            .cloned()
            .unwrap_or_else(|| group.to_owned())
    }

    /// Every feature named for `group`, or `{group}` when there is none.
    pub fn feature_ids(&self, group: &str) -> BTreeSet<String> {
        match self.by_platform.get(group) {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => BTreeSet::from([group.to_owned()]),
        }
    }

    /// Features of `group` whose window overlaps `[start, end]`, or `{group}`
    /// when there is none. Windows that only touch the range at a bound do
    /// not count.
    pub fn feature_ids_between(
        &self,
        group: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> BTreeSet<String> {
        let ids: BTreeSet<String> = self
            .by_time
            .get(group)
            .map(|tree| {
                tree.search_overlapping(start, end)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if ids.is_empty() {
            return BTreeSet::from([group.to_owned()]);
        }
        ids
    }

    /// The time index of `group`, if any of its records had a valid window.
    pub fn tree(&self, group: &str) -> Option<&IntervalTree<Timestamp, String>> {
        self.by_time.get(group)
    }

    /// Every group named by the batch, sorted.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.by_platform.keys().map(String::as_str).collect();
        groups.sort_unstable();
        groups
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of records the snapshot was built from.
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Number of records left out of the time index.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.by_platform.is_empty()
    }
}
