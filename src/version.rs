// SPDX-License-Identifier: MPL-2.0

//! Traits and implementations to create and compare versions.
//!
//! Every package ecosystem orders its versions its own way. The constraint algebra only ever
//! asks a version for [`Ord`] and [`Display`], so one [Version] type stands for one ordering
//! family and two families can never meet inside a [Constraint](crate::constraint::Constraint).
//!
//! Two stock orderings are provided: [NumberVersion], a plain integer, and [DottedVersion], a
//! dot-separated list of integers. [AnyVersion] carries either one with a runtime tag, for
//! callers that receive versions from several ecosystems at once; comparing two different kinds
//! there is an error rather than an arbitrary answer.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

use crate::error::VersionError;

/// A version from one ordering family.
pub trait Version: Clone + Ord + Debug + Display {
    /// Name of the ordering family.
    const KIND: &'static str;

    /// Parse a version from its canonical text.
    fn parse(text: &str) -> Result<Self, VersionParseError>;
}

/// Error creating a version from a [String].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The text holds no version at all.
    #[error("empty version")]
    Empty,
    /// Wrapper around [ParseIntError](core::num::ParseIntError).
    #[error("cannot parse '{version_part}' in '{full_version}' as u64: {parse_error}")]
    ParseIntError {
        /// Version that was being parsed.
        full_version: String,
        /// A version part where parsing failed.
        version_part: String,
        /// A specific error resulted from parsing a part of the version as [u64].
        parse_error: String,
    },
    /// Rejected by an ecosystem-specific parser.
    #[error("invalid version '{full_version}': {reason}")]
    Invalid {
        /// Version that was being parsed.
        full_version: String,
        /// Why the parser rejected it.
        reason: String,
    },
    /// No ordering family with that name.
    #[error("unknown version kind '{kind}'")]
    UnknownKind {
        /// The requested kind.
        kind: String,
    },
}

fn parse_u64(full_version: &str, part: &str) -> Result<u64, VersionParseError> {
    part.parse::<u64>()
        .map_err(|e| VersionParseError::ParseIntError {
            full_version: full_version.to_string(),
            version_part: part.to_string(),
            parse_error: e.to_string(),
        })
}

// NumberVersion ###############################################################

/// Simplest versions possible, just a positive number.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct NumberVersion(pub u64);

// Convert an u64 into a version.
impl From<u64> for NumberVersion {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// Convert a version into an u64.
impl From<NumberVersion> for u64 {
    fn from(version: NumberVersion) -> Self {
        version.0
    }
}

impl Display for NumberVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NumberVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        parse_u64(s, s).map(Self)
    }
}

impl Version for NumberVersion {
    const KIND: &'static str = "number";

    fn parse(text: &str) -> Result<Self, VersionParseError> {
        text.parse()
    }
}

// DottedVersion ###############################################################

/// Dot-separated numeric components: `1`, `2.0`, `1.1.1`.
///
/// Components compare left to right and missing trailing components count as zero,
/// so `1.0 == 1` while `2.999 < 3.0`. Components are stored as numbers: the text form keeps
/// their count, so `2.0` stays `2.0`, but drops leading zeros, so `1.01` reads back as `1.1`.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    components: Vec<u64>,
}

impl DottedVersion {
    /// Create a version from its components.
    pub fn new(components: impl Into<Vec<u64>>) -> Self {
        Self {
            components: components.into(),
        }
    }

    /// Components as written.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Components without the trailing zeros, which do not take part in ordering.
    fn significant(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |last| last + 1);
        &self.components[..len]
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| {
                let left = self.components.get(i).copied().unwrap_or(0);
                let right = other.components.get(i).copied().unwrap_or(0);
                left.cmp(&right)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl Hash for DottedVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl From<&[u64]> for DottedVersion {
    fn from(components: &[u64]) -> Self {
        Self::new(components)
    }
}

impl<const N: usize> From<[u64; N]> for DottedVersion {
    fn from(components: [u64; N]) -> Self {
        Self::new(components)
    }
}

impl Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl FromStr for DottedVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let components = s
            .split('.')
            .map(|part| parse_u64(s, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl Version for DottedVersion {
    const KIND: &'static str = "dotted";

    fn parse(text: &str) -> Result<Self, VersionParseError> {
        text.parse()
    }
}

// AnyVersion ##################################################################

/// A version tagged at runtime with its ordering family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyVersion {
    /// A [NumberVersion].
    Number(NumberVersion),
    /// A [DottedVersion].
    Dotted(DottedVersion),
}

impl AnyVersion {
    /// Parse `text` with the ordering family named `kind`.
    pub fn parse(kind: &str, text: &str) -> Result<Self, VersionParseError> {
        if kind == NumberVersion::KIND {
            NumberVersion::parse(text).map(Self::Number)
        } else if kind == DottedVersion::KIND {
            DottedVersion::parse(text).map(Self::Dotted)
        } else {
            Err(VersionParseError::UnknownKind {
                kind: kind.to_string(),
            })
        }
    }

    /// Name of the ordering family.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => NumberVersion::KIND,
            Self::Dotted(_) => DottedVersion::KIND,
        }
    }

    /// Compare with another version of the same family.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, VersionError> {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => Ok(left.cmp(right)),
            (Self::Dotted(left), Self::Dotted(right)) => Ok(left.cmp(right)),
            _ => Err(VersionError::KindMismatch {
                left: self.kind(),
                right: other.kind(),
            }),
        }
    }

    /// Sort versions newest first, provided they all belong to one family.
    /// The slice is left untouched on error.
    pub fn sort_newest_first(versions: &mut [AnyVersion]) -> Result<(), VersionError> {
        if let Some((first, rest)) = versions.split_first() {
            if let Some(stranger) = rest.iter().find(|v| v.kind() != first.kind()) {
                return Err(VersionError::KindMismatch {
                    left: first.kind(),
                    right: stranger.kind(),
                });
            }
        }
        versions.sort_by(|a, b| b.try_cmp(a).unwrap_or(Ordering::Equal));
        Ok(())
    }
}

impl From<NumberVersion> for AnyVersion {
    fn from(version: NumberVersion) -> Self {
        Self::Number(version)
    }
}

impl From<DottedVersion> for AnyVersion {
    fn from(version: DottedVersion) -> Self {
        Self::Dotted(version)
    }
}

impl Display for AnyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Dotted(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dotted(s: &str) -> DottedVersion {
        s.parse().unwrap()
    }

    #[test]
    fn dotted_ordering() {
        assert!(dotted("2.0") < dotted("2.999"));
        assert!(dotted("2.999") < dotted("3.0"));
        assert!(dotted("1.10") > dotted("1.9"));
        assert_eq!(dotted("1.0"), dotted("1"));
        assert_eq!(dotted("1.0.0").cmp(&dotted("1")), Ordering::Equal);
    }

    #[test]
    fn dotted_text_form() {
        assert_eq!(dotted("1.0").to_string(), "1.0");
        assert_eq!(dotted("2.0").to_string(), "2.0");
        assert_eq!(dotted("1.01").to_string(), "1.1");
        assert_eq!(dotted(" 4.5.6 ").to_string(), "4.5.6");
        assert_eq!(DottedVersion::from([1, 2]).components(), &[1, 2]);
    }

    #[test]
    fn equal_dotted_versions_hash_alike() {
        use std::collections::HashSet;
        let set: HashSet<_> = [dotted("1"), dotted("1.0"), dotted("1.0.0")].into();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<DottedVersion>().unwrap_err(), VersionParseError::Empty);
        assert!(matches!(
            "1.x".parse::<DottedVersion>(),
            Err(VersionParseError::ParseIntError { version_part, .. }) if version_part == "x"
        ));
        assert!(matches!(
            "1..2".parse::<DottedVersion>(),
            Err(VersionParseError::ParseIntError { .. })
        ));
        assert!("-1".parse::<NumberVersion>().is_err());
        assert_eq!("42".parse::<NumberVersion>(), Ok(NumberVersion(42)));
    }

    #[test]
    fn any_version_compares_within_a_kind() {
        let a = AnyVersion::parse("dotted", "1.2").unwrap();
        let b = AnyVersion::parse("dotted", "1.10").unwrap();
        assert_eq!(a.try_cmp(&b), Ok(Ordering::Less));
        let n = AnyVersion::parse("number", "3").unwrap();
        assert_eq!(n.try_cmp(&n.clone()), Ok(Ordering::Equal));
    }

    #[test]
    fn any_version_rejects_mixed_kinds() {
        let dotted = AnyVersion::from(DottedVersion::from([1]));
        let number = AnyVersion::from(NumberVersion(1));
        assert_eq!(
            dotted.try_cmp(&number),
            Err(VersionError::KindMismatch {
                left: "dotted",
                right: "number"
            })
        );

        let mut versions = vec![dotted.clone(), number];
        assert!(AnyVersion::sort_newest_first(&mut versions).is_err());
        assert_eq!(versions[0], dotted);
    }

    #[test]
    fn any_version_sorts_newest_first() {
        let mut versions: Vec<_> = ["1.0", "3.1", "2"]
            .iter()
            .map(|s| AnyVersion::parse("dotted", s).unwrap())
            .collect();
        AnyVersion::sort_newest_first(&mut versions).unwrap();
        let texts: Vec<_> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(texts, vec!["3.1", "2", "1.0"]);
    }

    #[test]
    fn unknown_kind() {
        assert_eq!(
            AnyVersion::parse("debian", "1:2.0-1"),
            Err(VersionParseError::UnknownKind {
                kind: "debian".into()
            })
        );
    }
}
