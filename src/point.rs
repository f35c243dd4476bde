//! Distance metric over interval bounds, used by nearest-match lookups.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// A bound type whose values can be compared by how far apart they are.
pub trait Point: Ord {
    /// Magnitude of the gap between two points.
    type Distance: Ord;

    /// Non-negative distance between `self` and `other`.
    fn distance(&self, other: &Self) -> Self::Distance;
}

macro_rules! impl_point_for_int {
    ($($t:ty => $d:ty),* $(,)?) => {
        $(
            impl Point for $t {
                type Distance = $d;

                #[inline]
                fn distance(&self, other: &Self) -> $d {
                    self.abs_diff(*other)
                }
            }
        )*
    };
}

impl_point_for_int!(
    i32 => u32,
    i64 => u64,
    u32 => u32,
    u64 => u64,
    usize => usize,
);

macro_rules! impl_point_for_chrono {
    ($($t:ty),* $(,)?) => {
        $(
            impl Point for $t {
                type Distance = Duration;

                #[inline]
                fn distance(&self, other: &Self) -> Duration {
                    if self >= other {
                        self.signed_duration_since(*other)
                    } else {
                        other.signed_duration_since(*self)
                    }
                }
            }
        )*
    };
}

impl_point_for_chrono!(
    DateTime<Utc>,
    DateTime<FixedOffset>,
    NaiveDateTime,
    NaiveDate,
);
