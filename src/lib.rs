// SPDX-License-Identifier: MPL-2.0

//! Dependency specification core of a universal package builder.
//!
//! Upstream packages from heterogeneous ecosystems (OS archives, language wheels, model-hub
//! files) are turned into portable artifacts called prefabs, each shipped with a blueprint
//! describing how to assemble and run it. This crate holds the ecosystem-neutral part of that
//! pipeline:
//!
//! - [Constraint](constraint::Constraint): sets of versions of one repository kind, built on
//!   the interval algebra of [`version_intervals`], with a specifier grammar and JSON form.
//! - [PrefabReference](reference::PrefabReference): a wanted package, `[Kind] Name [Specifier]`.
//! - [Blueprint](blueprint::Blueprint): the manifest of a prefab, whose dependencies are slots
//!   of alternative references, and its line-oriented text form.
//! - [Repo](repo::Repo): what a package ecosystem must provide, and [select](repo::select) to
//!   pick a version and an environment for a reference.
//!
//! # Version trait
//!
//! Constraints are generic over a [Version](version::Version): any `Clone + Ord + Debug +
//! Display` type that can parse itself from text. Two stock orderings ship with the crate,
//! [NumberVersion](version::NumberVersion) and [DottedVersion](version::DottedVersion).
//!
//! # Basic example
//!
//! ```
//! # use prefab::constraint::Constraint;
//! # use prefab::reference::PrefabReference;
//! # use prefab::repo::{select, OfflineRepo};
//! # use prefab::version::DottedVersion;
//! let mut repo = OfflineRepo::<DottedVersion>::new("Apt");
//! for version in ["1.1.1", "3.0.2"] {
//!     let version: DottedVersion = version.parse().unwrap();
//!     repo.add_package("libssl", version, ["amd64"], Vec::new());
//! }
//!
//! let wanted: PrefabReference = "[Apt] libssl [>=1.1, <3]".parse().unwrap();
//! let selection = select(&repo, &wanted).unwrap().unwrap();
//! assert_eq!(selection.version.to_string(), "1.1.1");
//!
//! let c = Constraint::<DottedVersion>::parse("Apt", ">= 1.0, < 2.0").unwrap();
//! let d = Constraint::<DottedVersion>::parse("Apt", ">= 1.5").unwrap();
//! assert_eq!(c.intersect(&d).to_string(), ">=1.5, <2.0");
//! ```
//!
//! # Logging
//!
//! Decoding and selection emit traces through the [log] facade. Decode warnings go to
//! `warn!`, everything else to `debug!` and `info!`.

#![warn(missing_docs)]

pub mod blueprint;
pub mod constraint;
pub mod deployability;
pub mod error;
pub mod reference;
pub mod repo;
pub mod version;

mod type_aliases;

pub use type_aliases::Map;
pub use version_intervals::{Intervals, VersionRange};
