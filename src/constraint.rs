// SPDX-License-Identifier: MPL-2.0

//! Version constraints of one repository kind.
//!
//! A [Constraint] pairs an [Intervals] set with the repository type it applies to and the text
//! it was written as. Constraints are values: every set operation returns a new constraint, in
//! canonical form, and never fails.
//!
//! Specifiers are decoded with a small ecosystem-neutral grammar:
//!
//! ```text
//! specifier := group (("|" | "||") group)*
//! group     := term ("," term)*
//! term      := ">=" v | ">" v | "<=" v | "<" v | "==" v | "=" v | "!=" v | v
//!            | "*" | "any" | "∅" | "none"
//! ```
//!
//! Groups are united and terms of a group are intersected. An empty specifier means any version.

use std::fmt::{self, Display};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use version_intervals::{Intervals, VersionRange};

use crate::error::ConstraintError;
use crate::version::Version;

/// Text kept for a constraint accepting every version.
const ANY: &str = "*";

/// A set of versions for packages of one repository type.
#[derive(Debug, Clone)]
pub struct Constraint<V> {
    repo_type: String,
    ranges: Intervals<V>,
    raw: String,
}

impl<V: Version> Constraint<V> {
    /// Constraint accepting every version.
    pub fn any(repo_type: impl Into<String>) -> Self {
        Self {
            repo_type: repo_type.into(),
            ranges: Intervals::full(),
            raw: ANY.to_string(),
        }
    }

    /// Constraint accepting no version.
    pub fn empty(repo_type: impl Into<String>) -> Self {
        Self::from_intervals(repo_type, Intervals::empty())
    }

    /// Constraint accepting exactly one version.
    pub fn singleton(repo_type: impl Into<String>, version: impl Into<V>) -> Self {
        Self::from_intervals(repo_type, Intervals::singleton(version))
    }

    /// Wrap an interval set, canonicalizing it.
    pub fn from_intervals(repo_type: impl Into<String>, ranges: Intervals<V>) -> Self {
        let ranges = ranges.canonical();
        Self {
            repo_type: repo_type.into(),
            raw: ranges.to_string(),
            ranges,
        }
    }

    /// The smallest constraint that, among `all`, accepts exactly the `selected` versions.
    /// Both slices must be sorted ascending.
    pub fn from_version_subset(repo_type: impl Into<String>, selected: &[V], all: &[V]) -> Self {
        Self::from_intervals(repo_type, Intervals::from_version_subset(selected, all))
    }

    /// Decode a specifier, see the [module documentation](self) for the grammar.
    pub fn parse(repo_type: impl Into<String>, specifier: &str) -> Result<Self, ConstraintError> {
        let trimmed = specifier.trim();
        let ranges = if trimmed.is_empty() {
            Intervals::full()
        } else {
            let mut ranges = Intervals::empty();
            let mut groups = 0;
            for group in trimmed.split('|').filter(|g| !g.trim().is_empty()) {
                groups += 1;
                ranges = ranges.union(&parse_group::<V>(specifier, group)?);
            }
            if groups == 0 {
                return Err(ConstraintError::EmptyTerm {
                    specifier: specifier.to_string(),
                });
            }
            ranges
        };
        log::debug!("specifier '{specifier}' decoded to {ranges}");
        Ok(Self {
            repo_type: repo_type.into(),
            ranges,
            raw: specifier.to_string(),
        })
    }
}

fn parse_group<V: Version>(specifier: &str, group: &str) -> Result<Intervals<V>, ConstraintError> {
    let mut ranges = Intervals::full();
    for term in group.split(',') {
        ranges = ranges.intersection(&parse_term(specifier, term.trim())?);
    }
    Ok(ranges)
}

/// Comparison operators, longest first so `>=` is never read as `>`.
const OPERATORS: [&str; 7] = [">=", "<=", "==", "!=", ">", "<", "="];

fn parse_term<V: Version>(specifier: &str, term: &str) -> Result<Intervals<V>, ConstraintError> {
    match term {
        "" => {
            return Err(ConstraintError::EmptyTerm {
                specifier: specifier.to_string(),
            })
        }
        "*" => return Ok(Intervals::full()),
        "∅" => return Ok(Intervals::empty()),
        t if t.eq_ignore_ascii_case("any") => return Ok(Intervals::full()),
        t if t.eq_ignore_ascii_case("none") => return Ok(Intervals::empty()),
        _ => {}
    }
    let (operator, text) = OPERATORS
        .iter()
        .find_map(|op| term.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .unwrap_or(("==", term));
    let version = V::parse(text).map_err(|e| ConstraintError::InvalidVersion {
        specifier: specifier.to_string(),
        text: text.to_string(),
        reason: e.to_string(),
    })?;
    Ok(match operator {
        ">=" => Intervals::higher_than(version),
        ">" => Intervals::strictly_higher_than(version),
        "<=" => Intervals::lower_than(version),
        "<" => Intervals::strictly_lower_than(version),
        "!=" => Intervals::singleton(version).complement(),
        _ => Intervals::singleton(version),
    })
}

impl<V> Constraint<V> {
    /// Repository type the constraint applies to.
    pub fn repo_type(&self) -> &str {
        &self.repo_type
    }

    /// The underlying set of versions.
    pub fn ranges(&self) -> &Intervals<V> {
        &self.ranges
    }

    /// Text the constraint was decoded from, or the rendering of a derived constraint.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Iterate over the ranges, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionRange<V>> {
        self.ranges.iter()
    }
}

impl<V: Version> Constraint<V> {
    /// Append a raw range. Call [canonical](Self::canonical) before relying on set invariants.
    pub fn add_range(
        &mut self,
        lower: Option<V>,
        upper: Option<V>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) {
        self.ranges
            .add_range(lower, upper, lower_inclusive, upper_inclusive);
        self.raw = self.ranges.to_string();
    }

    /// The same constraint with sorted, disjoint and non-mergeable ranges.
    pub fn canonical(&self) -> Self {
        self.derive(self.ranges.canonical())
    }

    /// Whether `version` is accepted.
    pub fn contains(&self, version: &V) -> bool {
        self.ranges.contains(version)
    }

    /// Whether every version is accepted.
    pub fn is_any(&self) -> bool {
        self.ranges.is_full()
    }

    /// Whether no version is accepted.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Versions accepted by both constraints.
    pub fn intersect(&self, other: &Self) -> Self {
        self.check_repo_type(other, "intersection");
        self.derive(self.ranges.intersection(&other.ranges))
    }

    /// Versions accepted by either constraint.
    pub fn union(&self, other: &Self) -> Self {
        self.check_repo_type(other, "union");
        self.derive(self.ranges.union(&other.ranges))
    }

    /// Versions not accepted by this constraint.
    pub fn inverse(&self) -> Self {
        self.derive(self.ranges.complement())
    }

    /// Versions accepted by this constraint but not by `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.check_repo_type(other, "difference");
        self.derive(self.ranges.difference(&other.ranges))
    }

    /// Whether every version accepted here is also accepted by `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.check_repo_type(other, "subset check");
        self.ranges.subset_of(&other.ranges)
    }

    /// Whether no version is accepted by both constraints.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.check_repo_type(other, "disjoint check");
        self.ranges.is_disjoint(&other.ranges)
    }

    /// Keep the accepted versions, newest first.
    pub fn filter_and_sort<I: IntoIterator<Item = V>>(&self, versions: I) -> Vec<V> {
        self.ranges.filter_and_sort(versions)
    }

    fn derive(&self, ranges: Intervals<V>) -> Self {
        Self {
            repo_type: self.repo_type.clone(),
            raw: ranges.to_string(),
            ranges,
        }
    }

    fn check_repo_type(&self, other: &Self, operation: &str) {
        if self.repo_type != other.repo_type {
            log::debug!(
                "{operation} of a {} constraint with a {} constraint keeps {}",
                self.repo_type,
                other.repo_type,
                self.repo_type
            );
        }
    }

    /// Encode as JSON, bounds rendered as text and an empty string for an unbounded side.
    pub fn to_json(&self) -> Result<String, ConstraintError> {
        Ok(serde_json::to_string(&ConstraintRecord::from(self))?)
    }

    /// Decode from JSON, canonicalizing the ranges received.
    pub fn from_json(text: &str) -> Result<Self, ConstraintError> {
        let record: ConstraintRecord = serde_json::from_str(text)?;
        record.into_constraint()
    }
}

/// Equality compares the repository type and the ranges, the raw text is presentation only.
impl<V: PartialEq> PartialEq for Constraint<V> {
    fn eq(&self, other: &Self) -> bool {
        self.repo_type == other.repo_type && self.ranges == other.ranges
    }
}

impl<V: Eq> Eq for Constraint<V> {}

impl<V: Version> Display for Constraint<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ranges.canonical())
    }
}

// JSON ########################################################################

#[derive(Serialize, Deserialize)]
struct ConstraintRecord {
    repo_type: String,
    ranges: Vec<RangeRecord>,
    #[serde(default)]
    raw: String,
}

#[derive(Serialize, Deserialize)]
struct RangeRecord {
    lower_bound: String,
    upper_bound: String,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

fn bound_text<V: Display>(bound: std::ops::Bound<&V>) -> String {
    match bound {
        std::ops::Bound::Included(v) | std::ops::Bound::Excluded(v) => v.to_string(),
        std::ops::Bound::Unbounded => String::new(),
    }
}

impl<V: Version> From<&Constraint<V>> for ConstraintRecord {
    fn from(constraint: &Constraint<V>) -> Self {
        Self {
            repo_type: constraint.repo_type.clone(),
            ranges: constraint
                .ranges
                .iter()
                .map(|range| RangeRecord {
                    lower_bound: bound_text(range.lower()),
                    upper_bound: bound_text(range.upper()),
                    lower_inclusive: range.lower_inclusive(),
                    upper_inclusive: range.upper_inclusive(),
                })
                .collect(),
            raw: constraint.raw.clone(),
        }
    }
}

impl ConstraintRecord {
    fn into_constraint<V: Version>(self) -> Result<Constraint<V>, ConstraintError> {
        let parse = |text: &str| -> Result<Option<V>, ConstraintError> {
            if text.is_empty() {
                return Ok(None);
            }
            V::parse(text)
                .map(Some)
                .map_err(|e| ConstraintError::InvalidVersion {
                    specifier: self.raw.clone(),
                    text: text.to_string(),
                    reason: e.to_string(),
                })
        };
        let mut ranges = Intervals::empty();
        for range in &self.ranges {
            ranges.add_range(
                parse(&range.lower_bound)?,
                parse(&range.upper_bound)?,
                range.lower_inclusive,
                range.upper_inclusive,
            );
        }
        let ranges = ranges.canonical();
        let raw = if self.raw.is_empty() {
            ranges.to_string()
        } else {
            self.raw.clone()
        };
        Ok(Constraint {
            repo_type: self.repo_type,
            ranges,
            raw,
        })
    }
}

impl<V: Version> Serialize for Constraint<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ConstraintRecord::from(self).serialize(serializer)
    }
}

impl<'de, V: Version> Deserialize<'de> for Constraint<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ConstraintRecord::deserialize(deserializer)?
            .into_constraint()
            .map_err(serde::de::Error::custom)
    }
}
