// SPDX-License-Identifier: MPL-2.0

//! Ranges are constraints defining sets of versions.
//!
//! Concretely, a range is any set of versions representable as the union
//! of intervals over the version line. The building blocks are:
//!  - [empty()](VersionRange::empty): the empty set
//!  - [any()](VersionRange::any): the set of all possible versions
//!  - [exact(v)](VersionRange::exact): the set containing only the version v
//!  - [higher_than(v)](VersionRange::higher_than): the set defined by `v <= versions`
//!  - [strictly_higher_than(v)](VersionRange::strictly_higher_than): the set defined by `v < versions`
//!  - [lower_than(v)](VersionRange::lower_than): the set defined by `versions <= v`
//!  - [strictly_lower_than(v)](VersionRange::strictly_lower_than): the set defined by `versions < v`
//!  - [between(v1, v2)](VersionRange::between): the set defined by `v1 <= versions < v2`
//!
//! Ranges are kept in a canonical form: intervals in a union are non-empty,
//! pairwise disjoint, non-touching and sorted in ascending order, so that
//! structural equality coincides with set equality.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// A set of versions, in canonical form.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VersionRange<V> {
    /// Contains no version. The unique empty range.
    Empty,
    /// A single contiguous, non-empty interval.
    Interval(Interval<V>),
    /// Two or more disjoint, non-touching intervals in ascending order.
    Union(Vec<Interval<V>>),
}

/// One contiguous interval of versions, with optional endpoints.
///
/// A missing `min` means unbounded below, a missing `max` unbounded above.
/// Either `min < max`, or `min == max` with both endpoints included
/// (a point interval).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval<V> {
    min: Option<V>,
    include_min: bool,
    max: Option<V>,
    include_max: bool,
}

impl<V: Ord> Interval<V> {
    /// Build an interval, returning `None` if the bounds leave no version in it.
    fn checked(min: Option<V>, include_min: bool, max: Option<V>, include_max: bool) -> Option<Self> {
        if let (Some(low), Some(high)) = (&min, &max) {
            match low.cmp(high) {
                Ordering::Greater => return None,
                Ordering::Equal if !(include_min && include_max) => return None,
                _ => {}
            }
        }
        Some(Self {
            min,
            include_min,
            max,
            include_max,
        })
    }

    fn new(min: Option<V>, include_min: bool, max: Option<V>, include_max: bool) -> Self {
        Self::checked(min, include_min, max, include_max)
            .expect("malformed interval: min must be lower than max, or equal with both endpoints included")
    }

    /// Membership, respecting open and closed endpoints.
    fn contains(&self, v: &V) -> bool {
        let above_min = match &self.min {
            None => true,
            Some(m) if self.include_min => v >= m,
            Some(m) => v > m,
        };
        let below_max = match &self.max {
            None => true,
            Some(m) if self.include_max => v <= m,
            Some(m) => v < m,
        };
        above_min && below_max
    }

    /// Compare lower bounds; an inclusive bound starts earlier than an
    /// exclusive one on the same version, and no bound earlier than any.
    fn cmp_lower(&self, other: &Self) -> Ordering {
        match (&self.min, &other.min) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b).then(match (self.include_min, other.include_min) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            }),
        }
    }

    /// Compare upper bounds; an inclusive bound extends further than an
    /// exclusive one on the same version, and no bound further than any.
    fn cmp_upper(&self, other: &Self) -> Ordering {
        match (&self.max, &other.max) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b).then(match (self.include_max, other.include_max) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ => Ordering::Equal,
            }),
        }
    }

    /// True iff every version of `self` is below every version of `other`:
    /// a touching endpoint only counts as shared when both sides include it.
    fn strictly_lower_than(&self, other: &Self) -> bool {
        match (&self.max, &other.min) {
            (None, _) | (_, None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => true,
                Ordering::Equal => !(self.include_max && other.include_min),
                Ordering::Greater => false,
            },
        }
    }

    /// True iff there is a gap between `self` and `other`: the union of
    /// touching intervals is contiguous as long as either side includes
    /// the shared endpoint.
    fn gap_before(&self, other: &Self) -> bool {
        match (&self.max, &other.min) {
            (None, _) | (_, None) => false,
            (Some(a), Some(b)) => match a.cmp(b) {
                Ordering::Less => true,
                Ordering::Equal => !(self.include_max || other.include_min),
                Ordering::Greater => false,
            },
        }
    }

    fn intersects(&self, other: &Self) -> bool {
        !self.strictly_lower_than(other) && !other.strictly_lower_than(self)
    }
}

impl<V: Ord + Clone> Interval<V> {
    /// Pointwise greater min and pointwise lesser max; equal endpoints keep
    /// the stricter (exclusive) flag. Collapses to `None` when nothing is left.
    fn intersection(&self, other: &Self) -> Option<Self> {
        let (min, include_min) = if self.cmp_lower(other) == Ordering::Greater {
            (self.min.clone(), self.include_min)
        } else {
            (other.min.clone(), other.include_min)
        };
        let (max, include_max) = if self.cmp_upper(other) == Ordering::Less {
            (self.max.clone(), self.include_max)
        } else {
            (other.max.clone(), other.include_max)
        };
        Self::checked(min, include_min, max, include_max)
    }

    /// The pieces of the version line not covered by this interval.
    fn complement_pieces(&self) -> Vec<Self> {
        let mut pieces = Vec::new();
        if let Some(m) = &self.min {
            pieces.push(Self::new(None, false, Some(m.clone()), !self.include_min));
        }
        if let Some(m) = &self.max {
            pieces.push(Self::new(Some(m.clone()), !self.include_max, None, false));
        }
        pieces
    }
}

impl<V> VersionRange<V> {
    /// Empty set of versions.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Set of all possible versions.
    pub fn any() -> Self {
        Self::Interval(Interval {
            min: None,
            include_min: false,
            max: None,
            include_max: false,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_any(&self) -> bool {
        matches!(
            self,
            Self::Interval(Interval {
                min: None, max: None, ..
            })
        )
    }

    fn as_intervals(&self) -> &[Interval<V>] {
        match self {
            Self::Empty => &[],
            Self::Interval(interval) => std::slice::from_ref(interval),
            Self::Union(intervals) => intervals,
        }
    }
}

impl<V: Ord> VersionRange<V> {
    /// Set of all versions higher or equal to some version.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self::Interval(Interval::new(Some(v.into()), true, None, false))
    }

    /// Set of all versions strictly higher than some version.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self::Interval(Interval::new(Some(v.into()), false, None, false))
    }

    /// Set of all versions lower or equal to some version.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self::Interval(Interval::new(None, false, Some(v.into()), true))
    }

    /// Set of all versions strictly lower than some version.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self::Interval(Interval::new(None, false, Some(v.into()), false))
    }

    /// Set of versions greater or equal to `v1` but less than `v2`.
    /// Panics if `v2 <= v1` (a construction error).
    pub fn between(v1: impl Into<V>, v2: impl Into<V>) -> Self {
        Self::Interval(Interval::new(Some(v1.into()), true, Some(v2.into()), false))
    }

    /// General interval constructor with explicit endpoint inclusivity.
    /// Panics if the bounds leave no version in the interval
    /// (a construction error).
    pub fn interval(min: Option<V>, include_min: bool, max: Option<V>, include_max: bool) -> Self {
        Self::Interval(Interval::new(min, include_min, max, include_max))
    }

    /// Returns true if this range contains the specified version.
    pub fn contains(&self, v: &V) -> bool {
        self.as_intervals().iter().any(|interval| interval.contains(v))
    }

    /// True iff at least one version lies in both ranges.
    pub fn intersects(&self, other: &Self) -> bool {
        self.as_intervals()
            .iter()
            .any(|a| other.as_intervals().iter().any(|b| a.intersects(b)))
    }

    /// Canonicalise a list of intervals: sort ascending, then merge every
    /// pair that overlaps or touches, so equality stays structural.
    fn from_intervals(mut intervals: Vec<Interval<V>>) -> Self {
        intervals.sort_by(|a, b| a.cmp_lower(b));
        let mut merged: Vec<Interval<V>> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if !last.gap_before(&interval) => {
                    if last.cmp_upper(&interval) == Ordering::Less {
                        last.max = interval.max;
                        last.include_max = interval.include_max;
                    }
                }
                _ => merged.push(interval),
            }
        }
        match merged.len() {
            0 => Self::Empty,
            1 => Self::Interval(merged.pop().expect("len checked")),
            _ => Self::Union(merged),
        }
    }
}

impl<V: Ord + Clone> VersionRange<V> {
    /// Set containing exactly one version.
    pub fn exact(v: impl Into<V>) -> Self {
        let v = v.into();
        Self::Interval(Interval::new(Some(v.clone()), true, Some(v), true))
    }

    /// Computes the intersection of two sets of versions:
    /// the greatest lower bound in the range lattice.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut intervals = Vec::new();
        for a in self.as_intervals() {
            for b in other.as_intervals() {
                if let Some(common) = a.intersection(b) {
                    intervals.push(common);
                }
            }
        }
        Self::from_intervals(intervals)
    }

    /// Computes the union of two sets of versions:
    /// the least upper bound in the range lattice.
    pub fn union(&self, other: &Self) -> Self {
        let mut intervals = self.as_intervals().to_vec();
        intervals.extend_from_slice(other.as_intervals());
        Self::from_intervals(intervals)
    }

    /// Returns the complement of this range over the whole version line.
    pub fn complement(&self) -> Self {
        match self {
            Self::Empty => Self::any(),
            Self::Interval(interval) => Self::from_intervals(interval.complement_pieces()),
            // De Morgan: the complement of a union is the
            // intersection of the member complements.
            Self::Union(intervals) => intervals
                .iter()
                .map(|interval| Self::from_intervals(interval.complement_pieces()))
                .fold(Self::any(), |acc, piece| acc.intersection(&piece)),
        }
    }

    /// Indicate if this range is a subset of another range.
    pub fn subset_of(&self, other: &Self) -> bool {
        self == &self.intersection(other)
    }
}

// REPORT ######################################################################

impl<V: Display + Eq> Display for VersionRange<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "none"),
            Self::Interval(interval) => write!(f, "{}", interval),
            Self::Union(intervals) => {
                for (idx, interval) in intervals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", interval)?;
                }
                Ok(())
            }
        }
    }
}

impl<V: Display + Eq> Display for Interval<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "any"),
            (Some(a), Some(b)) if a == b => write!(f, "= {}", a),
            (Some(a), None) => {
                write!(f, "{} {}", if self.include_min { ">=" } else { ">" }, a)
            }
            (None, Some(b)) => {
                write!(f, "{} {}", if self.include_max { "<=" } else { "<" }, b)
            }
            (Some(a), Some(b)) => write!(
                f,
                "{} {}, {} {}",
                if self.include_min { ">=" } else { ">" },
                a,
                if self.include_max { "<=" } else { "<" },
                b,
            ),
        }
    }
}

// PARSING #####################################################################

/// Error parsing the canonical textual form of a range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRangeError {
    /// A fragment was not one of `any`, `none`, `= v`, `> v`, `>= v`, `< v`, `<= v`.
    #[error("invalid range fragment `{0}`")]
    InvalidFragment(String),
    /// The version part of a fragment did not parse.
    #[error("invalid version in fragment `{0}`")]
    InvalidVersion(String),
    /// The fragments of one interval contradict each other.
    #[error("conflicting bounds in `{0}`")]
    ConflictingBounds(String),
}

impl<V: FromStr + Ord + Clone> FromStr for VersionRange<V> {
    type Err = ParseRangeError;

    /// Parses the exact grammar produced by [Display]: `none`, `any`,
    /// comparison fragments joined by `, `, intervals joined by ` or `.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "none" {
            return Ok(Self::Empty);
        }
        let mut intervals = Vec::new();
        for part in s.split(" or ") {
            intervals.push(parse_interval(part.trim())?);
        }
        Ok(Self::from_intervals(intervals))
    }
}

fn parse_interval<V: FromStr + Ord + Clone>(part: &str) -> Result<Interval<V>, ParseRangeError> {
    if part == "any" {
        return Interval::checked(None, false, None, false)
            .ok_or_else(|| ParseRangeError::InvalidFragment(part.into()));
    }
    let mut min = None;
    let mut include_min = false;
    let mut max = None;
    let mut include_max = false;
    for fragment in part.split(", ") {
        let fragment = fragment.trim();
        let (op, version) = fragment
            .split_once(' ')
            .ok_or_else(|| ParseRangeError::InvalidFragment(fragment.into()))?;
        let version: V = version
            .trim()
            .parse()
            .map_err(|_| ParseRangeError::InvalidVersion(fragment.into()))?;
        match op {
            "=" => {
                if min.is_some() || max.is_some() {
                    return Err(ParseRangeError::ConflictingBounds(part.into()));
                }
                min = Some(version.clone());
                include_min = true;
                max = Some(version);
                include_max = true;
            }
            ">" | ">=" => {
                if min.is_some() {
                    return Err(ParseRangeError::ConflictingBounds(part.into()));
                }
                min = Some(version);
                include_min = op == ">=";
            }
            "<" | "<=" => {
                if max.is_some() {
                    return Err(ParseRangeError::ConflictingBounds(part.into()));
                }
                max = Some(version);
                include_max = op == "<=";
            }
            _ => return Err(ParseRangeError::InvalidFragment(fragment.into())),
        }
    }
    Interval::checked(min, include_min, max, include_max)
        .ok_or_else(|| ParseRangeError::ConflictingBounds(part.into()))
}

// TESTS #######################################################################

#[cfg(test)]
pub mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Arbitrary canonical ranges over `u32`.
    pub fn strategy() -> impl Strategy<Value = VersionRange<u32>> {
        prop_oneof![
            1 => Just(VersionRange::Empty),
            9 => interval_strategy(),
        ]
    }

    /// Non-empty ranges, built by cutting the version line at random points
    /// and keeping random slices of it.
    fn interval_strategy() -> impl Strategy<Value = VersionRange<u32>> {
        (
            prop::collection::vec(any::<u32>(), 0..8),
            prop::collection::vec(any::<bool>(), 10),
        )
            .prop_map(|(mut cuts, flags)| {
                cuts.sort_unstable();
                cuts.dedup();
                let mut intervals = Vec::new();
                let mut bounds = cuts.into_iter();
                let mut flags = flags.into_iter().cycle();
                let mut flag = || flags.next().unwrap();
                let mut lower = if flag() {
                    None
                } else {
                    bounds.next().map(|v| (v, flag()))
                };
                loop {
                    let upper = bounds.next().map(|v| (v, flag()));
                    let min = lower.clone().map(|(v, _)| v);
                    let include_min = lower.map_or(false, |(_, i)| i);
                    let max = upper.clone().map(|(v, _)| v);
                    let include_max = upper.clone().map_or(false, |(_, i)| i);
                    if let Some(interval) = Interval::checked(min, include_min, max, include_max) {
                        intervals.push(interval);
                    }
                    if upper.is_none() {
                        break;
                    }
                    lower = bounds.next().map(|v| (v, flag()));
                    if lower.is_none() {
                        break;
                    }
                }
                VersionRange::from_intervals(intervals)
            })
    }

    fn version_strat() -> impl Strategy<Value = u32> {
        any::<u32>()
    }

    proptest! {

        // Testing complement ------------------------------

        #[test]
        fn double_complement_is_identity(range in strategy()) {
            prop_assert_eq!(range.complement().complement(), range);
        }

        #[test]
        fn complement_contains_opposite(range in strategy(), version in version_strat()) {
            prop_assert_ne!(range.contains(&version), range.complement().contains(&version));
        }

        #[test]
        fn intersection_of_complements_is_empty(range in strategy()) {
            prop_assert_eq!(range.complement().intersection(&range), VersionRange::empty());
        }

        #[test]
        fn union_of_complements_is_any(range in strategy()) {
            prop_assert_eq!(range.complement().union(&range), VersionRange::any());
        }

        // Testing intersection ----------------------------

        #[test]
        fn intersection_is_symmetric(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.intersection(&r2), r2.intersection(&r1));
        }

        #[test]
        fn intersection_is_idempotent(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.intersection(&r2).intersection(&r2), r1.intersection(&r2));
        }

        #[test]
        fn intersection_is_associative(r1 in strategy(), r2 in strategy(), r3 in strategy()) {
            prop_assert_eq!(
                r1.intersection(&r2).intersection(&r3),
                r1.intersection(&r2.intersection(&r3))
            );
        }

        #[test]
        fn intersection_with_any_is_identity(range in strategy()) {
            prop_assert_eq!(VersionRange::any().intersection(&range), range);
        }

        #[test]
        fn intersection_with_empty_is_empty(range in strategy()) {
            prop_assert_eq!(VersionRange::empty().intersection(&range), VersionRange::empty());
        }

        #[test]
        fn intersection_contains_both(r1 in strategy(), r2 in strategy(), version in version_strat()) {
            prop_assert_eq!(
                r1.intersection(&r2).contains(&version),
                r1.contains(&version) && r2.contains(&version)
            );
        }

        #[test]
        fn intersects_iff_intersection_nonempty(r1 in strategy(), r2 in strategy()) {
            prop_assert_eq!(r1.intersects(&r2), !r1.intersection(&r2).is_empty());
        }

        // Testing union -----------------------------------

        #[test]
        fn union_contains_either(r1 in strategy(), r2 in strategy(), version in version_strat()) {
            prop_assert_eq!(
                r1.union(&r2).contains(&version),
                r1.contains(&version) || r2.contains(&version)
            );
        }

        // Testing contains --------------------------------

        #[test]
        fn always_contains_exact(version in version_strat()) {
            prop_assert!(VersionRange::exact(version).contains(&version));
        }

        // Testing rendering -------------------------------

        #[test]
        fn display_parse_round_trip(range in strategy()) {
            let rendered = range.to_string();
            let reparsed: VersionRange<u32> = rendered.parse().unwrap();
            prop_assert_eq!(reparsed, range);
        }
    }

    #[test]
    fn canonical_form_collapses() {
        let a: VersionRange<u32> = VersionRange::between(1u32, 3u32).union(&VersionRange::between(3u32, 5u32));
        assert_eq!(a, VersionRange::between(1u32, 5u32));
        let b: VersionRange<u32> = VersionRange::exact(2u32).union(&VersionRange::strictly_lower_than(2u32));
        assert_eq!(b, VersionRange::lower_than(2u32));
    }

    #[test]
    fn touching_exclusive_bounds_stay_split() {
        let below: VersionRange<u32> = VersionRange::strictly_lower_than(2u32);
        let above = VersionRange::strictly_higher_than(2u32);
        let hole = below.union(&above);
        assert!(matches!(hole, VersionRange::Union(_)));
        assert!(!hole.contains(&2));
        assert_eq!(hole.complement(), VersionRange::exact(2u32));
    }

    #[test]
    fn rendering_examples() {
        assert_eq!(VersionRange::<u32>::any().to_string(), "any");
        assert_eq!(VersionRange::<u32>::empty().to_string(), "none");
        assert_eq!(VersionRange::<u32>::exact(2u32).to_string(), "= 2");
        assert_eq!(VersionRange::<u32>::between(1u32, 4u32).to_string(), ">= 1, < 4");
        let hole: VersionRange<u32> = VersionRange::strictly_lower_than(2u32).union(&VersionRange::higher_than(5u32));
        assert_eq!(hole.to_string(), "< 2 or >= 5");
    }

    #[test]
    #[should_panic]
    fn inverted_bounds_are_a_construction_error() {
        let _: VersionRange<u32> = VersionRange::between(4u32, 1u32);
    }
}
