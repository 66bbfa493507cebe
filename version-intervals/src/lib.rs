// SPDX-License-Identifier: MPL-2.0

//! Generic interval arithmetic over opaque, totally ordered versions.
//!
//! [`Intervals`] represents a set of versions such as `(>=1, <2) | (==3) | (>4)` as a list of
//! [`VersionRange`]s with inclusive, exclusive or open ends. The only thing ever asked of a
//! version is [`Ord`]: nothing here inspects how a version is built, which lets every package
//! ecosystem plug its own ordering in.
//!
//! Basic building blocks:
//!  - [empty()](Intervals::empty): No version
//!  - [full()](Intervals::full): All versions
//!  - [singleton(v)](Intervals::singleton): Only the version v exactly
//!  - [higher_than(v)](Intervals::higher_than): All versions `v <= versions`
//!  - [strictly_higher_than(v)](Intervals::strictly_higher_than): All versions `v < versions`
//!  - [lower_than(v)](Intervals::lower_than): All versions `versions <= v`
//!  - [strictly_lower_than(v)](Intervals::strictly_lower_than): All versions `versions < v`
//!  - [between(v1, v2)](Intervals::between): All versions `v1 <= versions < v2`
//!
//! Ranges can also be appended raw with [add_range](Intervals::add_range), in any order and
//! overlapping each other. [canonical](Intervals::canonical) turns such a list into the
//! canonical form: sorted by lower bound, non-overlapping, and with no two neighbours that
//! could be merged. Every set operation returns canonical output.
//!
//! The versions are treated as a dense line: nothing is known about what lies between two
//! versions, so `[1, 1]` and `[2, 2]` are never merged even for integer versions.
//!
//! ## Optional features
//!
//! * `proptest`: Exports proptest strategies for [`Intervals<u32>`].

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::ops::Bound::{self, Excluded, Included, Unbounded};

#[cfg(any(feature = "proptest", test))]
use proptest::prelude::*;
use smallvec::{smallvec, SmallVec};

mod event;

pub use event::{BoundEvent, Side};
use event::cmp_lower;

/// A single contiguous interval of versions.
///
/// Each end is either a version, included or excluded, or unbounded (`-∞` below, `+∞` above).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VersionRange<V> {
    lower: Bound<V>,
    upper: Bound<V>,
}

impl<V> VersionRange<V> {
    /// Interval from its two ends.
    /// It's the caller responsibility to order them correctly, see [is_empty](Self::is_empty).
    pub fn new(lower: Bound<V>, upper: Bound<V>) -> Self {
        Self { lower, upper }
    }

    /// Interval from optional ends and inclusivity flags.
    /// A missing end is unbounded and its flag is ignored.
    pub fn from_parts(
        lower: Option<V>,
        upper: Option<V>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self {
        let to_bound = |v: Option<V>, inclusive: bool| match v {
            None => Unbounded,
            Some(v) if inclusive => Included(v),
            Some(v) => Excluded(v),
        };
        Self::new(
            to_bound(lower, lower_inclusive),
            to_bound(upper, upper_inclusive),
        )
    }

    /// The interval with no bound on either side.
    pub fn full() -> Self {
        Self::new(Unbounded, Unbounded)
    }

    /// Lower end.
    pub fn lower(&self) -> Bound<&V> {
        self.lower.as_ref()
    }

    /// Upper end.
    pub fn upper(&self) -> Bound<&V> {
        self.upper.as_ref()
    }

    /// Whether the lower end is a version that belongs to the interval.
    pub fn lower_inclusive(&self) -> bool {
        matches!(self.lower, Included(_))
    }

    /// Whether the upper end is a version that belongs to the interval.
    pub fn upper_inclusive(&self) -> bool {
        matches!(self.upper, Included(_))
    }

    /// Whether neither side is bounded.
    pub fn is_full(&self) -> bool {
        matches!((&self.lower, &self.upper), (Unbounded, Unbounded))
    }

    /// Take both ends out.
    pub fn into_bounds(self) -> (Bound<V>, Bound<V>) {
        (self.lower, self.upper)
    }
}

impl<V: Clone> VersionRange<V> {
    /// The interval `[v, v]`.
    pub fn singleton(v: V) -> Self {
        Self::new(Included(v.clone()), Included(v))
    }
}

impl<V: Ord> VersionRange<V> {
    /// An interval is empty when its ends cross, or meet while at least one is exclusive.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Unbounded, _) | (_, Unbounded) => false,
            (Included(l), Included(u)) => l > u,
            (Included(l) | Excluded(l), Included(u) | Excluded(u)) => l >= u,
        }
    }

    /// Returns true if `version` lies inside the interval.
    pub fn contains(&self, version: &V) -> bool {
        let above_lower = match &self.lower {
            Unbounded => true,
            Included(l) => version >= l,
            Excluded(l) => version > l,
        };
        let below_upper = match &self.upper {
            Unbounded => true,
            Included(u) => version <= u,
            Excluded(u) => version < u,
        };
        above_lower && below_upper
    }
}

impl<V: Ord + Clone> VersionRange<V> {
    /// Intersection of two intervals, [None] if they do not overlap.
    ///
    /// Each side keeps the more restrictive of the two candidate bounds.
    /// When both candidates hold the same version, exclusivity wins.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let lower = tighter(self.lower(), other.lower(), Ordering::Greater);
        let upper = tighter(self.upper(), other.upper(), Ordering::Less);
        let range = Self::new(lower.cloned(), upper.cloned());
        (!range.is_empty()).then_some(range)
    }

    /// Everything outside the interval: zero, one or two intervals.
    /// An unbounded side contributes nothing.
    pub fn complement(&self) -> Intervals<V> {
        let mut segments = SmallVec::new();
        match &self.lower {
            Unbounded => {}
            Included(v) => segments.push(Self::new(Unbounded, Excluded(v.clone()))),
            Excluded(v) => segments.push(Self::new(Unbounded, Included(v.clone()))),
        }
        match &self.upper {
            Unbounded => {}
            Included(v) => segments.push(Self::new(Excluded(v.clone()), Unbounded)),
            Excluded(v) => segments.push(Self::new(Included(v.clone()), Unbounded)),
        }
        Intervals { segments }
    }
}

/// Pick the more restrictive of two bounds of the same side.
/// `keep` is the ordering of the winning value relative to the losing one.
fn tighter<'a, V: Ord>(left: Bound<&'a V>, right: Bound<&'a V>, keep: Ordering) -> Bound<&'a V> {
    match (left, right) {
        (Unbounded, bound) | (bound, Unbounded) => bound,
        (Included(l) | Excluded(l), Included(r) | Excluded(r)) => match l.cmp(r) {
            Ordering::Equal => {
                if matches!((left, right), (Included(_), Included(_))) {
                    Included(l)
                } else {
                    Excluded(l)
                }
            }
            ordering if ordering == keep => left,
            _ => right,
        },
    }
}

/// A set of versions, as a union of [`VersionRange`]s.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Intervals<V> {
    /// Most constraints hold a single range.
    segments: SmallVec<[VersionRange<V>; 1]>,
}

impl<V> Intervals<V> {
    /// Empty set of versions.
    pub fn empty() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// Set of all possible versions.
    pub fn full() -> Self {
        Self {
            segments: smallvec![VersionRange::full()],
        }
    }

    /// Set of all versions higher or equal to some version.
    pub fn higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::new(Included(v.into()), Unbounded)],
        }
    }

    /// Set of all versions strictly higher than some version.
    pub fn strictly_higher_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::new(Excluded(v.into()), Unbounded)],
        }
    }

    /// Set of all versions lower or equal to some version.
    pub fn lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::new(Unbounded, Included(v.into()))],
        }
    }

    /// Set of all versions strictly lower than some version.
    pub fn strictly_lower_than(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::new(Unbounded, Excluded(v.into()))],
        }
    }

    /// Set of versions greater or equal to `v1` but less than `v2`.
    pub fn between(v1: impl Into<V>, v2: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::new(Included(v1.into()), Excluded(v2.into()))],
        }
    }

    /// Whether the set holds no range at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the set is exactly one range unbounded on both sides.
    pub fn is_full(&self) -> bool {
        matches!(self.segments.as_slice(), [only] if only.is_full())
    }

    /// Append a raw range.
    ///
    /// The result is generally not canonical: call [canonical](Self::canonical) before
    /// relying on sorting or on ranges being disjoint.
    pub fn add_range(
        &mut self,
        lower: Option<V>,
        upper: Option<V>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) {
        self.push(VersionRange::from_parts(
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        ));
    }

    /// Append a raw range, see [add_range](Self::add_range).
    pub fn push(&mut self, range: VersionRange<V>) {
        self.segments.push(range);
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Iterate over the ranges, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionRange<V>> {
        self.segments.iter()
    }
}

impl<V: Clone> Intervals<V> {
    /// Set containing exactly one version.
    pub fn singleton(v: impl Into<V>) -> Self {
        Self {
            segments: smallvec![VersionRange::singleton(v.into())],
        }
    }
}

impl<V: Ord> Intervals<V> {
    /// Returns true if `version` lies in at least one of the ranges.
    pub fn contains(&self, version: &V) -> bool {
        self.segments.iter().any(|segment| segment.contains(version))
    }

    /// Whether ranges are sorted, valid, and separated by a gap.
    pub fn is_canonical(&self) -> bool {
        self.segments.iter().all(|s| !s.is_empty())
            && self
                .segments
                .windows(2)
                .all(|pair| end_before_start_with_gap(pair[0].upper(), pair[1].lower()))
    }

    fn check_invariants(self) -> Self {
        if cfg!(debug_assertions) {
            assert!(self.is_canonical(), "ranges are not canonical");
        }
        self
    }
}

/// The end of one interval is before the start of the next one, so they can't be concatenated
/// into a single interval.
///
/// ```text
/// True for these two:
///  |----|
///                |-----|
///       ^ end    ^ start
/// False for these two:
///  |----|
///     |-----|
/// Here it depends: If they both exclude the position they share, there is a version in between
/// them that blocks concatenation
///  |----|
///       |-----|
/// ```
fn end_before_start_with_gap<V: Ord>(end: Bound<&V>, start: Bound<&V>) -> bool {
    match (end, start) {
        (_, Unbounded) | (Unbounded, _) => false,
        (Excluded(left), Excluded(right)) => left <= right,
        (Included(left) | Excluded(left), Included(right) | Excluded(right)) => left < right,
    }
}

impl<V: Ord + Clone> Intervals<V> {
    /// Merge the ranges into the canonical form.
    ///
    /// Each non-empty range contributes a lower and an upper [`BoundEvent`]. Once sorted, the
    /// events are swept with a nesting depth: a range opens when the depth leaves zero and
    /// closes when it returns to zero.
    pub fn canonical(&self) -> Self {
        let mut events = Vec::with_capacity(2 * self.segments.len());
        for segment in self.segments.iter().filter(|s| !s.is_empty()) {
            events.push(BoundEvent::lower(segment.lower()));
            events.push(BoundEvent::upper(segment.upper()));
        }
        events.sort();

        let mut segments: SmallVec<[VersionRange<V>; 1]> = SmallVec::new();
        let mut depth = 0usize;
        let mut start = None;
        for event in events {
            match event.side() {
                Side::Lower => {
                    depth += 1;
                    if depth == 1 {
                        start = Some(event.bound());
                    }
                }
                Side::Upper => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(lower) = start.take() {
                            segments.push(VersionRange::new(lower.cloned(), event.bound().cloned()));
                        }
                    }
                }
            }
        }
        // Ranges were emitted in closing order.
        segments.sort_by(|a, b| cmp_lower(a.lower(), b.lower()));

        Self { segments }.check_invariants()
    }

    /// Computes the intersection of two sets of versions.
    ///
    /// Every range of one side is intersected with every range of the other side.
    pub fn intersection(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let mut pieces = Self::empty();
        for left in &self.segments {
            for right in &other.segments {
                if let Some(piece) = left.intersection(right) {
                    pieces.push(piece);
                }
            }
        }
        pieces.canonical()
    }

    /// Computes the union of this set and another.
    pub fn union(&self, other: &Self) -> Self {
        let mut pieces = self.clone();
        pieces.segments.extend(other.segments.iter().cloned());
        pieces.canonical()
    }

    /// Returns the complement, which contains everything not included in `self`.
    ///
    /// The complement of a union is the intersection of the complements of its ranges.
    pub fn complement(&self) -> Self {
        self.segments
            .iter()
            .map(VersionRange::complement)
            .fold(Self::full(), |acc, outside| acc.intersection(&outside))
    }

    /// Versions in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.complement())
    }

    /// Return true if every version contained in `self` is also contained in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        self.difference(other).is_empty()
    }

    /// Return true if no version is contained in both `self` and `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    /// Keep the contained versions, newest first.
    pub fn filter_and_sort<I>(&self, versions: I) -> Vec<V>
    where
        I: IntoIterator<Item = V>,
    {
        let mut kept: Vec<V> = versions.into_iter().filter(|v| self.contains(v)).collect();
        kept.sort_by(|a, b| b.cmp(a));
        kept
    }

    /// The smallest set that, among `all`, contains exactly the `selected` versions.
    ///
    /// Each selected version is bracketed by its neighbours in `all`, both excluded, with an
    /// open end when it is the first or last of `all`. Adjacent selections merge. A selected
    /// version missing from `all` is kept as a singleton.
    ///
    /// Both slices must be sorted ascending.
    pub fn from_version_subset(selected: &[V], all: &[V]) -> Self {
        let mut bracketed = Self::empty();
        for version in selected {
            let range = match all.binary_search(version) {
                Ok(index) => {
                    let lower = match index.checked_sub(1) {
                        Some(previous) => Excluded(all[previous].clone()),
                        None => Unbounded,
                    };
                    let upper = all
                        .get(index + 1)
                        .map_or(Unbounded, |next| Excluded(next.clone()));
                    VersionRange::new(lower, upper)
                }
                Err(_) => VersionRange::singleton(version.clone()),
            };
            bracketed.push(range);
        }
        bracketed.canonical()
    }
}

impl<V> FromIterator<VersionRange<V>> for Intervals<V> {
    fn from_iter<T: IntoIterator<Item = VersionRange<V>>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

// REPORT ######################################################################

impl<V: Display + Eq> Display for VersionRange<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.lower, &self.upper) {
            (Unbounded, Unbounded) => write!(f, "*"),
            (Unbounded, Included(v)) => write!(f, "<={v}"),
            (Unbounded, Excluded(v)) => write!(f, "<{v}"),
            (Included(v), Unbounded) => write!(f, ">={v}"),
            (Included(v), Included(b)) => {
                if v == b {
                    write!(f, "=={v}")
                } else {
                    write!(f, ">={v}, <={b}")
                }
            }
            (Included(v), Excluded(b)) => write!(f, ">={v}, <{b}"),
            (Excluded(v), Unbounded) => write!(f, ">{v}"),
            (Excluded(v), Included(b)) => write!(f, ">{v}, <={b}"),
            (Excluded(v), Excluded(b)) => write!(f, ">{v}, <{b}"),
        }
    }
}

impl<V: Display + Eq> Display for Intervals<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "∅");
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

// STRATEGIES ##################################################################

/// Generate canonical sets from a random vector of deltas between randomly inclusive or
/// exclusive bounds.
#[cfg(any(feature = "proptest", test))]
pub fn proptest_strategy() -> impl Strategy<Value = Intervals<u32>> {
    (
        any::<bool>(),
        prop::collection::vec((0u32..8, any::<bool>()), 1..10),
    )
        .prop_map(|(start_unbounded, deltas)| {
            let mut start = if start_unbounded {
                Some(Unbounded)
            } else {
                None
            };
            let mut largest: u32 = 0;
            let mut last_bound_was_inclusive = false;
            let mut segments = SmallVec::new();
            for (delta, inclusive) in deltas {
                largest += delta;
                let current_bound = if inclusive {
                    Included(largest)
                } else {
                    Excluded(largest)
                };

                if let Some(start_bound) = start.take() {
                    // A zero-width range is only valid as `[x, x]`.
                    if delta == 0 && !(matches!(start_bound, Included(_)) && inclusive) {
                        start = Some(start_bound);
                        continue;
                    }
                    last_bound_was_inclusive = inclusive;
                    segments.push(VersionRange::new(start_bound, current_bound));
                } else {
                    // Touching the previous range with an inclusive side would merge them.
                    if delta == 0 && (last_bound_was_inclusive || inclusive) {
                        continue;
                    }
                    start = Some(current_bound);
                }
            }

            if let Some(start_bound) = start {
                segments.push(VersionRange::new(start_bound, Unbounded));
            }

            Intervals { segments }.check_invariants()
        })
}

/// Generate raw, possibly overlapping, unsorted or empty ranges.
///
/// Bounds are even numbers, so probing odd numbers checks versions lying strictly between
/// two bounds.
#[cfg(any(feature = "proptest", test))]
pub fn raw_proptest_strategy() -> impl Strategy<Value = Intervals<u32>> {
    prop::collection::vec((even_bound_strategy(), even_bound_strategy()), 0..6).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(lower, upper)| VersionRange::new(lower, upper))
            .collect()
    })
}

#[cfg(any(feature = "proptest", test))]
fn even_bound_strategy() -> impl Strategy<Value = Bound<u32>> {
    prop_oneof![
        1 => Just(Unbounded),
        4 => (0u32..=10, any::<bool>()).prop_map(|(half, inclusive)| {
            if inclusive {
                Included(2 * half)
            } else {
                Excluded(2 * half)
            }
        }),
    ]
}
