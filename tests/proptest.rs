// SPDX-License-Identifier: MPL-2.0

use std::ops::Bound::{self, Excluded, Included, Unbounded};

use prefab::blueprint::{Blueprint, DependencySlot, EnvVar};
use prefab::constraint::Constraint;
use prefab::deployability::Deployability;
use prefab::error::BlueprintError;
use prefab::reference::PrefabReference;
use prefab::version::NumberVersion;
use prefab::Intervals;

use proptest::collection::vec;
use proptest::option;
use proptest::sample::Index;
use proptest::prelude::*;
use proptest::string::string_regex;

use version_intervals::{proptest_strategy, raw_proptest_strategy};

/// Bounds generated by the strategies lie in `0..=20`, so these probes tell any two sets apart.
fn probes() -> impl Iterator<Item = NumberVersion> {
    (0..=22).map(NumberVersion)
}

fn bound_version(bound: Bound<&u32>) -> Option<NumberVersion> {
    match bound {
        Included(v) | Excluded(v) => Some(NumberVersion(u64::from(*v))),
        Unbounded => None,
    }
}

/// Copy the ranges, unchanged and in order, into a constraint.
fn to_constraint(ranges: &Intervals<u32>) -> Constraint<NumberVersion> {
    let mut constraint = Constraint::empty("Apt");
    for range in ranges.iter() {
        constraint.add_range(
            bound_version(range.lower()),
            bound_version(range.upper()),
            range.lower_inclusive(),
            range.upper_inclusive(),
        );
    }
    constraint
}

fn raw_constraint() -> impl Strategy<Value = Constraint<NumberVersion>> {
    raw_proptest_strategy().prop_map(|ranges| to_constraint(&ranges))
}

fn canonical_constraint() -> impl Strategy<Value = Constraint<NumberVersion>> {
    proptest_strategy().prop_map(|ranges| to_constraint(&ranges))
}

fn same_members(left: &Constraint<NumberVersion>, right: &Constraint<NumberVersion>) -> bool {
    probes().all(|v| left.contains(&v) == right.contains(&v))
}

proptest! {

    // Algebra ------------------------------------------

    #[test]
    fn intersection_with_inverse_is_empty(c in raw_constraint()) {
        prop_assert!(c.intersect(&c.inverse()).is_empty());
    }

    #[test]
    fn union_with_inverse_is_any(c in raw_constraint()) {
        prop_assert!(c.union(&c.inverse()).is_any());
    }

    #[test]
    fn canonical_is_idempotent(c in raw_constraint()) {
        let once = c.canonical();
        prop_assert_eq!(once.canonical(), once.clone());
        prop_assert!(same_members(&once, &c));
    }

    #[test]
    fn canonical_matches_brute_force(c in raw_constraint()) {
        let canonical = c.canonical();
        for v in probes() {
            let expected = c.iter().any(|range| range.contains(&v));
            prop_assert_eq!(canonical.contains(&v), expected);
        }
    }

    #[test]
    fn intersection_is_commutative(a in raw_constraint(), b in raw_constraint()) {
        prop_assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn union_is_commutative(a in raw_constraint(), b in raw_constraint()) {
        prop_assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn intersection_is_associative(a in raw_constraint(), b in raw_constraint(), c in raw_constraint()) {
        prop_assert_eq!(a.intersect(&b).intersect(&c), a.intersect(&b.intersect(&c)));
    }

    #[test]
    fn union_is_associative(a in raw_constraint(), b in raw_constraint(), c in raw_constraint()) {
        prop_assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
    }

    #[test]
    fn operations_match_membership(a in raw_constraint(), b in raw_constraint()) {
        let and = a.intersect(&b);
        let or = a.union(&b);
        let minus = a.difference(&b);
        for v in probes() {
            prop_assert_eq!(and.contains(&v), a.contains(&v) && b.contains(&v));
            prop_assert_eq!(or.contains(&v), a.contains(&v) || b.contains(&v));
            prop_assert_eq!(minus.contains(&v), a.contains(&v) && !b.contains(&v));
        }
    }

    #[test]
    fn subset_and_disjoint_agree_with_intersection(a in canonical_constraint(), b in canonical_constraint()) {
        prop_assert_eq!(a.is_subset_of(&b), a.intersect(&b) == a);
        prop_assert_eq!(a.is_disjoint(&b), a.intersect(&b).is_empty());
    }

    // Encodings ----------------------------------------

    #[test]
    fn json_keeps_members(c in raw_constraint()) {
        let back = Constraint::<NumberVersion>::from_json(&c.to_json().unwrap()).unwrap();
        prop_assert!(same_members(&back, &c));
        prop_assert_eq!(back, c.canonical());
    }

    #[test]
    fn display_parses_back(c in raw_constraint()) {
        let back = Constraint::<NumberVersion>::parse("Apt", &c.to_string()).unwrap();
        prop_assert_eq!(back, c.canonical());
    }

    #[test]
    fn blueprint_round_trip(blueprint in blueprint_strategy()) {
        let text = blueprint.encode().unwrap();
        let (back, warnings) = Blueprint::decode_with_warnings(&text).unwrap();
        prop_assert!(warnings.is_empty());
        prop_assert_eq!(back, blueprint);
    }

    #[test]
    fn reference_round_trip(reference in reference_strategy()) {
        let back: PrefabReference = reference.to_string().parse().unwrap();
        prop_assert_eq!(back, reference);
    }

    #[test]
    fn blueprint_values_with_line_breaks_are_rejected(
        mut blueprint in blueprint_strategy(),
        field in 0..8usize,
        at in any::<Index>(),
        line_break in prop_oneof![Just('\n'), Just('\r')],
    ) {
        match field {
            0 => insert_at(&mut blueprint.prefab_type, at, line_break),
            1 => insert_at(&mut blueprint.name, at, line_break),
            2 => insert_at(&mut blueprint.version, at, line_break),
            3 => insert_at(&mut blueprint.environment, at, line_break),
            4 => insert_at(blueprint.user.get_or_insert_with(String::new), at, line_break),
            5 => blueprint.env_vars.push(EnvVar::new("KEY", line_break.to_string())),
            6 => blueprint.entry_point.push(format!("sh{line_break}[USER] root")),
            _ => blueprint.command.push(format!("{line_break}run")),
        }
        let rejected = matches!(
            blueprint.encode(),
            Err(BlueprintError::InvalidValue { reason: "contains a line break", .. })
        );
        prop_assert!(rejected);
    }

    #[test]
    fn reference_fields_with_line_breaks_are_rejected(
        left in "[a-z]{1,4}",
        right in "[a-z ]{0,4}[a-z]",
        line_break in prop_oneof![Just("\n"), Just("\r"), Just("\r\n")],
        field in 0..3usize,
    ) {
        let broken = format!("{left}{line_break}{right}");
        let result = match field {
            0 => PrefabReference::new(broken, "name", "*"),
            1 => PrefabReference::new("Apt", broken, "*"),
            _ => PrefabReference::new("Apt", "name", broken),
        };
        prop_assert!(result.is_err());
    }
}

// Blueprint strategies ########################################################

/// Insert `c` at a char boundary picked by `at`.
fn insert_at(text: &mut String, at: Index, c: char) {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .collect();
    text.insert(*at.get(&boundaries), c);
}

/// Printable text from `core`, with up to two spaces on either side.
fn spaced(core: &str) -> impl Strategy<Value = String> {
    (" {0,2}", string_regex(core).unwrap(), " {0,2}")
        .prop_map(|(before, core, after)| format!("{before}{core}{after}"))
}

fn deployability_strategy() -> impl Strategy<Value = Deployability> {
    vec((spaced(r"\PC{0,6}"), spaced(r"\PC{0,6}")), 0..3)
        .prop_map(|facts| facts.into_iter().collect::<Deployability>())
}

fn reference_strategy() -> impl Strategy<Value = PrefabReference> {
    let field = || spaced(r"[^\[\]\pC]{0,8}");
    (field(), field(), field(), option::of(deployability_strategy())).prop_filter_map(
        "kind and name must not be blank",
        |(kind, name, specifier, deployability)| {
            let reference = PrefabReference::new(kind, name, specifier).ok()?;
            Some(match deployability {
                Some(deployability) => reference.with_deployability(deployability),
                None => reference,
            })
        },
    )
}

fn slot_strategy() -> impl Strategy<Value = DependencySlot> {
    (reference_strategy(), vec(reference_strategy(), 0..3)).prop_map(|(first, others)| {
        others.into_iter().fold(DependencySlot::new(first), DependencySlot::or)
    })
}

fn blueprint_strategy() -> impl Strategy<Value = Blueprint> {
    let text = || spaced(r"\PC{0,8}");
    let item = || spaced(r"\PC{1,8}");
    let identity = (text(), text(), text(), item());
    let runtime = (
        option::of(text()),
        option::of(text()),
        option::of(text()),
        vec((spaced(r"[^=\pC]{1,6}"), text()), 0..3),
    );
    let lists = (
        vec(item(), 0..3),
        vec(item(), 0..3),
        vec(slot_strategy(), 0..4),
        deployability_strategy(),
    );
    (identity, runtime, lists).prop_map(
        |(
            (prefab_type, name, version, environment),
            (user, work_dir, target_dir, env_vars),
            (entry_point, command, depend, context),
        )| {
            let mut blueprint = Blueprint::new(prefab_type, name, version);
            blueprint.environment = environment;
            blueprint.user = user;
            blueprint.work_dir = work_dir;
            blueprint.target_dir = target_dir;
            blueprint.env_vars = env_vars
                .into_iter()
                .map(|(key, value)| EnvVar::new(key, value))
                .collect();
            blueprint.entry_point = entry_point;
            blueprint.command = command;
            blueprint.depend = depend;
            blueprint.context = context;
            blueprint
        },
    )
}
