// SPDX-License-Identifier: MPL-2.0

//! References to wanted prefabs and their text form.
//!
//! A reference reads `[Kind] Name [Specifier]`, optionally followed by a brace block holding the
//! deployability filter as JSON: `[Apt] libssl [>=1.1] {\{"arch":"amd64"\}}`. Inside the block,
//! `\`, `{` and `}` are escaped with a backslash so the block end is never ambiguous.
//!
//! Kinds, names and specifiers cannot contain brackets. This keeps the first `[...]` the kind
//! and the last `[...]` the specifier whatever the name looks like.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::constraint::Constraint;
use crate::deployability::Deployability;
use crate::error::{ConstraintError, ReferenceError};
use crate::version::Version;

/// A wanted package: which repository kind, which name, which versions, and where it applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabReference {
    repo_kind: String,
    name: String,
    specifier: String,
    deployability: Option<Deployability>,
}

impl PrefabReference {
    /// Create a reference. Fields are trimmed, kind and name must not be empty,
    /// and no field may contain a bracket.
    pub fn new(
        repo_kind: impl Into<String>,
        name: impl Into<String>,
        specifier: impl Into<String>,
    ) -> Result<Self, ReferenceError> {
        let repo_kind = checked_field("repository kind", repo_kind.into(), false)?;
        let name = checked_field("name", name.into(), false)?;
        let specifier = checked_field("specifier", specifier.into(), true)?;
        Ok(Self {
            repo_kind,
            name,
            specifier,
            deployability: None,
        })
    }

    /// Attach a deployability filter.
    pub fn with_deployability(mut self, deployability: Deployability) -> Self {
        self.deployability = Some(deployability);
        self
    }

    /// Repository kind, such as `Apt`.
    pub fn repo_kind(&self) -> &str {
        &self.repo_kind
    }

    /// Package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version specifier as written.
    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// Deployability filter, if any.
    pub fn deployability(&self) -> Option<&Deployability> {
        self.deployability.as_ref()
    }

    /// Decode the specifier with the version ordering of the repository.
    pub fn constraint<V: Version>(&self) -> Result<Constraint<V>, ConstraintError> {
        Constraint::parse(self.repo_kind.as_str(), &self.specifier)
    }

    /// Whether the reference applies to a target described by `context`.
    pub fn admits(&self, context: &Deployability) -> bool {
        self.deployability
            .as_ref()
            .map_or(true, |filter| filter.admits(context))
    }
}

fn checked_field(
    field: &'static str,
    value: String,
    may_be_empty: bool,
) -> Result<String, ReferenceError> {
    let trimmed = value.trim();
    if !may_be_empty && trimmed.is_empty() {
        return Err(ReferenceError::InvalidField {
            field,
            value,
            reason: "must not be empty",
        });
    }
    if trimmed.contains(['[', ']']) {
        return Err(ReferenceError::InvalidField {
            field,
            value,
            reason: "must not contain brackets",
        });
    }
    if trimmed.contains(['\n', '\r']) {
        return Err(ReferenceError::InvalidField {
            field,
            value,
            reason: "must not contain line breaks",
        });
    }
    Ok(trimmed.to_string())
}

impl Display for PrefabReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} [{}]", self.repo_kind, self.name, self.specifier)?;
        if let Some(deployability) = &self.deployability {
            write!(f, " {{{}}}", escape(&deployability.to_json()))?;
        }
        Ok(())
    }
}

impl FromStr for PrefabReference {
    type Err = ReferenceError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| ReferenceError::Malformed {
            text: text.to_string(),
            reason,
        };
        let trimmed = text.trim();
        let (head, deployability) = match split_block(trimmed) {
            Some((head, payload)) => {
                let payload = unescape(payload);
                let deployability = Deployability::from_json(&payload).map_err(|source| {
                    ReferenceError::Deployability {
                        text: payload.clone(),
                        source,
                    }
                })?;
                (head.trim_end(), Some(deployability))
            }
            None => (trimmed, None),
        };
        let rest = head
            .strip_prefix('[')
            .ok_or_else(|| malformed("missing [Kind]"))?;
        let (kind, rest) = rest
            .split_once(']')
            .ok_or_else(|| malformed("unterminated [Kind]"))?;
        let rest = rest
            .strip_suffix(']')
            .ok_or_else(|| malformed("missing [Specifier]"))?;
        let (name, specifier) = rest
            .rsplit_once('[')
            .ok_or_else(|| malformed("missing [Specifier]"))?;
        let reference = Self::new(kind, name, specifier)?;
        Ok(match deployability {
            Some(deployability) => reference.with_deployability(deployability),
            None => reference,
        })
    }
}

/// Whether the character at `index` is preceded by an odd number of backslashes.
fn is_escaped(text: &str, index: usize) -> bool {
    text[..index]
        .bytes()
        .rev()
        .take_while(|b| *b == b'\\')
        .count()
        % 2
        == 1
}

/// Split a trailing `{...}` block off, returning the text before it and the raw block content.
fn split_block(text: &str) -> Option<(&str, &str)> {
    let close = text.len().checked_sub(1)?;
    if !text.ends_with('}') || is_escaped(text, close) {
        return None;
    }
    let open = text[..close]
        .match_indices('{')
        .map(|(index, _)| index)
        .rev()
        .find(|index| !is_escaped(text, *index))?;
    Some((&text[..open], &text[open + 1..close]))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                plain.push(next);
                continue;
            }
        }
        plain.push(c);
    }
    plain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reference() {
        let reference = PrefabReference::new("Apt", "libssl", ">=1.1").unwrap();
        assert_eq!(reference.to_string(), "[Apt] libssl [>=1.1]");
        assert_eq!("[Apt] libssl [>=1.1]".parse::<PrefabReference>().unwrap(), reference);
    }

    #[test]
    fn fields_are_trimmed() {
        let reference: PrefabReference = "  [ Pip ]  numpy   [ >=1, <2 ] ".parse().unwrap();
        assert_eq!(reference.repo_kind(), "Pip");
        assert_eq!(reference.name(), "numpy");
        assert_eq!(reference.specifier(), ">=1, <2");
    }

    #[test]
    fn names_may_hold_spaces_and_braces() {
        let reference = PrefabReference::new("Hub", "org/model {large} v2", "any").unwrap();
        let text = reference.to_string();
        assert_eq!(text.parse::<PrefabReference>().unwrap(), reference);
    }

    #[test]
    fn deployability_block_round_trips() {
        let filter = Deployability::new()
            .with("arch", "amd64")
            .with("note", r"a {b} \c");
        let reference = PrefabReference::new("Apt", "libssl", ">=1.1")
            .unwrap()
            .with_deployability(filter.clone());
        let text = reference.to_string();
        assert!(text.starts_with(r#"[Apt] libssl [>=1.1] {\{"arch":"amd64""#));
        let back: PrefabReference = text.parse().unwrap();
        assert_eq!(back.deployability(), Some(&filter));
        assert_eq!(back, reference);
    }

    #[test]
    fn empty_deployability_is_kept() {
        let reference = PrefabReference::new("Apt", "x", "")
            .unwrap()
            .with_deployability(Deployability::new());
        assert_eq!(reference.to_string(), r"[Apt] x [] {\{\}}");
        assert_eq!(reference.to_string().parse::<PrefabReference>().unwrap(), reference);
    }

    #[test]
    fn brackets_are_rejected() {
        assert!(matches!(
            PrefabReference::new("Apt", "lib[ssl]", "*"),
            Err(ReferenceError::InvalidField { field: "name", .. })
        ));
        assert!(matches!(
            "[Apt] lib]ssl [*]".parse::<PrefabReference>(),
            Err(ReferenceError::InvalidField { .. })
        ));
        assert!(matches!(
            PrefabReference::new(" ", "x", "*"),
            Err(ReferenceError::InvalidField { reason: "must not be empty", .. })
        ));
    }

    #[test]
    fn line_breaks_are_rejected() {
        for (kind, name, specifier, field) in [
            ("Apt", "a\nb", "*", "name"),
            ("Apt", "a\r\nb", "*", "name"),
            ("A\npt", "curl", "*", "repository kind"),
            ("Apt", "curl", ">=1\r<2", "specifier"),
        ] {
            assert!(matches!(
                PrefabReference::new(kind, name, specifier),
                Err(ReferenceError::InvalidField {
                    field: f,
                    reason: "must not contain line breaks",
                    ..
                }) if f == field
            ));
        }
        // Edge line breaks are trimmed like any other whitespace.
        assert_eq!(PrefabReference::new("Apt", "curl\n", "*").unwrap().name(), "curl");
    }

    #[test]
    fn malformed_text_is_reported() {
        for text in ["", "Apt libssl", "[Apt libssl", "[Apt] libssl", "[Apt] libssl >=1]"] {
            match text.parse::<PrefabReference>() {
                Err(ReferenceError::Malformed { text: offending, .. }) => assert_eq!(offending, text),
                other => panic!("{text:?} gave {other:?}"),
            }
        }
        assert!(matches!(
            "[Apt] x [*] {not json}".parse::<PrefabReference>(),
            Err(ReferenceError::Deployability { .. })
        ));
    }

    #[test]
    fn admits_without_filter() {
        let reference = PrefabReference::new("Apt", "x", "*").unwrap();
        assert!(reference.admits(&Deployability::new().with("arch", "arm64")));
        let filtered = reference.with_deployability(Deployability::new().with("arch", "amd64"));
        assert!(!filtered.admits(&Deployability::new().with("arch", "arm64")));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape(r"a\{b}"), r"a\\\{b\}");
        assert_eq!(unescape(&escape(r"a\{b}\")), r"a\{b}\");
        assert!(is_escaped(r"x\{", 2));
        assert!(!is_escaped(r"x\\{", 3));
    }
}
