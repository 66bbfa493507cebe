// SPDX-License-Identifier: MPL-2.0

//! Ordering of interval boundaries, used by the canonicalization sweep.
//!
//! Every interval contributes two events to the sweep: a lower event where coverage starts and
//! an upper event where it ends. The ordering below decides how coverage continues through a
//! shared boundary point.
//!
//! ```text
//! value:   -∞ ... v ... +∞
//! at v:    [v  <  v)  <  (v  <  v]
//!          ^ lower included      ^ upper included
//!                 ^ upper excluded
//!                       ^ lower excluded
//! ```
//!
//! With this ordering `[1, 2)` and `[2, 3]` sweep as one piece (the included lower at `2` comes
//! before the excluded upper), while `[1, 2)` and `(2, 3]` stay separate (the excluded upper
//! at `2` comes before the excluded lower).

use std::cmp::Ordering;
use std::ops::Bound::{self, Excluded, Included, Unbounded};

/// Whether an event opens or closes coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Start of an interval.
    Lower,
    /// End of an interval.
    Upper,
}

/// One boundary of an interval, positioned on the version line.
#[derive(Debug, Clone, Copy)]
pub struct BoundEvent<'a, V> {
    side: Side,
    bound: Bound<&'a V>,
}

/// Location of an event, with unbounded lower ends before everything
/// and unbounded upper ends after everything.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Position<'a, V> {
    NegativeInfinity,
    At(&'a V),
    PositiveInfinity,
}

impl<'a, V> BoundEvent<'a, V> {
    /// Event opening an interval at `bound`.
    pub fn lower(bound: Bound<&'a V>) -> Self {
        Self {
            side: Side::Lower,
            bound,
        }
    }

    /// Event closing an interval at `bound`.
    pub fn upper(bound: Bound<&'a V>) -> Self {
        Self {
            side: Side::Upper,
            bound,
        }
    }

    /// Which end of an interval this event is.
    pub fn side(&self) -> Side {
        self.side
    }

    /// The bound carried by this event.
    pub fn bound(&self) -> Bound<&'a V> {
        self.bound
    }

    fn position(&self) -> Position<'a, V> {
        match (self.side, self.bound) {
            (Side::Lower, Unbounded) => Position::NegativeInfinity,
            (Side::Upper, Unbounded) => Position::PositiveInfinity,
            (_, Included(v) | Excluded(v)) => Position::At(v),
        }
    }

    /// Rank among events sharing the same position.
    fn tie_rank(&self) -> u8 {
        match (self.side, self.bound) {
            (Side::Lower, Included(_)) | (_, Unbounded) => 0,
            (Side::Upper, Excluded(_)) => 1,
            (Side::Lower, Excluded(_)) => 2,
            (Side::Upper, Included(_)) => 3,
        }
    }
}

impl<V: Ord> Ord for BoundEvent<'_, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position()
            .cmp(&other.position())
            .then_with(|| self.tie_rank().cmp(&other.tie_rank()))
    }
}

impl<V: Ord> PartialOrd for BoundEvent<'_, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Ord> PartialEq for BoundEvent<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: Ord> Eq for BoundEvent<'_, V> {}

/// Compare two lower bounds: the one admitting more versions sorts first.
pub(crate) fn cmp_lower<V: Ord>(left: Bound<&V>, right: Bound<&V>) -> Ordering {
    BoundEvent::lower(left).cmp(&BoundEvent::lower(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(bound: Bound<&u32>) -> BoundEvent<'_, u32> {
        BoundEvent::lower(bound)
    }

    fn upper(bound: Bound<&u32>) -> BoundEvent<'_, u32> {
        BoundEvent::upper(bound)
    }

    #[test]
    fn unbounded_ends_sort_outermost() {
        assert!(lower(Unbounded) < lower(Included(&0)));
        assert!(lower(Unbounded) < upper(Excluded(&0)));
        assert!(upper(Unbounded) > upper(Included(&u32::MAX)));
        assert!(upper(Unbounded) > lower(Excluded(&u32::MAX)));
        assert!(lower(Unbounded) < upper(Unbounded));
    }

    #[test]
    fn value_dominates_tie_rank() {
        assert!(upper(Included(&1)) < lower(Included(&2)));
        assert!(lower(Excluded(&1)) < upper(Excluded(&2)));
    }

    #[test]
    fn shared_point_with_an_inclusive_side_opens_first() {
        assert!(lower(Included(&2)) < upper(Excluded(&2)));
        assert!(lower(Excluded(&2)) < upper(Included(&2)));
        assert!(lower(Included(&2)) < upper(Included(&2)));
    }

    #[test]
    fn shared_point_both_exclusive_closes_first() {
        assert!(upper(Excluded(&2)) < lower(Excluded(&2)));
    }

    #[test]
    fn same_side_ties() {
        assert!(upper(Excluded(&2)) < upper(Included(&2)));
        assert!(lower(Included(&2)) < lower(Excluded(&2)));
        assert_eq!(lower(Included(&2)), lower(Included(&2)));
        assert_eq!(upper(Unbounded), upper(Unbounded));
    }

    #[test]
    fn full_tie_order_at_one_point() {
        let v = 7;
        let mut events = vec![
            upper(Included(&v)),
            lower(Excluded(&v)),
            upper(Excluded(&v)),
            lower(Included(&v)),
        ];
        events.sort();
        let order: Vec<_> = events.iter().map(|e| (e.side(), e.bound())).collect();
        assert_eq!(
            order,
            vec![
                (Side::Lower, Included(&v)),
                (Side::Upper, Excluded(&v)),
                (Side::Lower, Excluded(&v)),
                (Side::Upper, Included(&v)),
            ]
        );
    }

    #[test]
    fn lower_bound_comparison() {
        assert_eq!(cmp_lower(Unbounded, Included(&0)), Ordering::Less);
        assert_eq!(cmp_lower(Included(&3), Excluded(&3)), Ordering::Less);
        assert_eq!(cmp_lower(Excluded(&3), Included(&4)), Ordering::Less);
        assert_eq!(cmp_lower::<u32>(Unbounded, Unbounded), Ordering::Equal);
    }
}
