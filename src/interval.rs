//! The `Interval` stored in `IntervalTree`, representing the closed range [lower, upper].
//!
//! Intervals are ordered by `lower` first and `upper` second. For instance, with
//! intervals of type `Interval<u32>`:
//! - [1,4]<[2,5], because 1<2
//! - [1,4]<[1,5], because 4<5
//!
//! This ordering only places intervals in the tree; whether two intervals
//! overlap is decided by [`Interval::overlaps`].

use thiserror::Error;

/// Errors produced while constructing an [`Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntervalError {
    /// The lower bound is after the upper bound.
    #[error("invalid interval: lower bound is after upper bound")]
    Inverted,
}

/// The interval stored in `IntervalTree`, represents [lower, upper]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "Bounds<T>",
        bound(deserialize = "T: serde::Deserialize<'de> + Ord")
    )
)]
#[non_exhaustive]
pub struct Interval<T> {
    /// Lower bound, inclusive
    pub lower: T,
    /// Upper bound, inclusive
    pub upper: T,
}

impl<T: Ord> Interval<T> {
    /// Create a new `Interval`
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::Inverted`] when `lower > upper`.
    ///
    /// # Example
    /// ```rust
    /// use feature_cache::{Interval, IntervalError};
    ///
    /// assert!(Interval::new(1, 1).is_ok());
    /// assert_eq!(Interval::new(3, 1), Err(IntervalError::Inverted));
    /// ```
    #[inline]
    pub fn new(lower: T, upper: T) -> Result<Self, IntervalError> {
        if lower > upper {
            return Err(IntervalError::Inverted);
        }
        Ok(Self { lower, upper })
    }

    /// Checks if self overlaps with other interval.
    ///
    /// Intervals that merely touch at a bound do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.lower < other.upper && other.lower < self.upper
    }

    /// Checks if `point` lies within `[lower, upper]`.
    #[inline]
    pub fn contains(&self, point: &T) -> bool {
        &self.lower <= point && point <= &self.upper
    }
}

impl<T: Ord + Clone> Interval<T> {
    /// Create the degenerate interval `[x, x]`.
    #[inline]
    pub fn point(x: T) -> Self {
        Self {
            lower: x.clone(),
            upper: x,
        }
    }
}

impl<T: Ord> TryFrom<(T, T)> for Interval<T> {
    type Error = IntervalError;

    fn try_from((lower, upper): (T, T)) -> Result<Self, Self::Error> {
        Self::new(lower, upper)
    }
}

/// Unchecked wire form of an `Interval`, validated on conversion.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct Bounds<T> {
    lower: T,
    upper: T,
}

#[cfg(feature = "serde")]
impl<T: Ord> TryFrom<Bounds<T>> for Interval<T> {
    type Error = IntervalError;

    fn try_from(bounds: Bounds<T>) -> Result<Self, Self::Error> {
        Self::new(bounds.lower, bounds.upper)
    }
}
