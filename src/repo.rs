// SPDX-License-Identifier: MPL-2.0

//! Repositories and selection of a prefab among their versions.
//!
//! A [Repo] is the boundary with a package ecosystem: it lists versions and environments and
//! fabricates prefabs. [select] drives one repository for one [PrefabReference]: it decodes the
//! specifier, keeps the matching versions newest first, and lets the repository pick the
//! version and the environment.
//!
//! [OfflineRepo] keeps everything in memory and writes blueprints only, which is enough to
//! exercise a resolution without any backend.

use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::blueprint::{Blueprint, DependencySlot, DEFAULT_ENVIRONMENT};
use crate::constraint::Constraint;
use crate::deployability::Deployability;
use crate::error::SelectError;
use crate::reference::PrefabReference;
use crate::type_aliases::Map;
use crate::version::Version;

/// Result of a repository call. Backend errors are opaque to the selection driver.
pub type RepoResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Environment tags a repository prefers, most preferred first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSpec {
    /// Preferred environment tags.
    pub preferred: Vec<String>,
}

impl EnvSpec {
    /// Preference list from tags.
    pub fn new<I, S>(preferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred: preferred.into_iter().map(Into::into).collect(),
        }
    }
}

/// Files produced by [Repo::fabricate].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fabrication {
    /// Packed artifacts.
    pub artifacts: Vec<PathBuf>,
    /// Blueprint manifests describing the artifacts.
    pub manifests: Vec<PathBuf>,
    /// Media type of the artifacts.
    pub content_type: String,
}

/// Trait that allows the selection driver to query a package ecosystem.
pub trait Repo {
    /// Version ordering of the ecosystem.
    type V: Version;

    /// Repository kind served, matched against [PrefabReference::repo_kind].
    fn repo_type(&self) -> &str;

    /// Prepare the repository for a deployment target.
    fn init(&mut self, context: &Deployability) -> RepoResult<()>;

    /// Environment preferences of this repository.
    fn env_spec(&self) -> EnvSpec;

    /// Lists available versions of a package, in any order.
    /// An unknown package has no version, which is not an error.
    fn versions(&self, name: &str) -> RepoResult<Vec<Self::V>>;

    /// Pick a version among matching candidates, given newest first.
    fn select_version(&self, candidates: &[Self::V]) -> Option<Self::V> {
        candidates.first().cloned()
    }

    /// Lists the environments a version is available for.
    fn envs(&self, name: &str, version: &Self::V) -> RepoResult<Vec<String>>;

    /// Pick an environment: the first preferred tag available, else the first one.
    fn select_env(&self, envs: &[String], spec: &EnvSpec) -> Option<String> {
        spec.preferred
            .iter()
            .find(|tag| envs.contains(*tag))
            .or_else(|| envs.first())
            .cloned()
    }

    /// Drop the environments the deployment target cannot use.
    fn filter_envs(&self, envs: Vec<String>) -> Vec<String> {
        envs
    }

    /// Build the prefab of a package version into `dest_dir`.
    fn fabricate(
        &self,
        name: &str,
        version: &Self::V,
        envs: &[String],
        dest_dir: &Path,
    ) -> RepoResult<Fabrication>;

    /// This is called before every selection,
    /// if it returns an Err then the selection is abandoned.
    fn should_cancel(&self) -> RepoResult<()> {
        Ok(())
    }
}

/// A version and environment chosen for a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<V> {
    /// Reference that was resolved.
    pub reference: PrefabReference,
    /// Chosen version.
    pub version: V,
    /// Chosen environment, [None] when the version lists none.
    pub env: Option<String>,
    /// Constraint decoded from the reference specifier.
    pub constraint: Constraint<V>,
}

/// Resolve one reference against one repository.
///
/// Returns `Ok(None)` when no available version satisfies the specifier.
pub fn select<R: Repo>(
    repo: &R,
    reference: &PrefabReference,
) -> Result<Option<Selection<R::V>>, SelectError> {
    repo.should_cancel().map_err(SelectError::ErrorShouldCancel)?;
    if reference.repo_kind() != repo.repo_type() {
        return Err(SelectError::RepoMismatch {
            reference_kind: reference.repo_kind().to_string(),
            repo_type: repo.repo_type().to_string(),
        });
    }
    let name = reference.name();
    let constraint: Constraint<R::V> =
        reference
            .constraint()
            .map_err(|source| SelectError::Specifier {
                package: name.to_string(),
                source,
            })?;

    let versions = repo
        .versions(name)
        .map_err(|source| SelectError::ErrorRetrievingVersions {
            package: name.to_string(),
            source,
        })?;
    let candidates = constraint.filter_and_sort(versions);
    log::debug!(
        "{} candidates for {name} within {constraint}",
        candidates.len()
    );
    let version = match repo.select_version(&candidates) {
        Some(version) => version,
        None => {
            log::debug!("no version of {name} matches {}", reference.specifier());
            return Ok(None);
        }
    };

    let envs = repo
        .envs(name, &version)
        .map_err(|source| SelectError::ErrorRetrievingEnvs {
            package: name.to_string(),
            version: version.to_string(),
            source,
        })?;
    let envs = repo.filter_envs(envs);
    let env = repo.select_env(&envs, &repo.env_spec());
    log::info!("selected {name} {version} for environment {env:?}");

    Ok(Some(Selection {
        reference: reference.clone(),
        version,
        env,
        constraint,
    }))
}

/// Resolve the first alternative of a slot that applies to `context` and that the repository
/// can satisfy. Alternatives for other repository kinds are skipped.
pub fn select_slot<R: Repo>(
    repo: &R,
    slot: &DependencySlot,
    context: &Deployability,
) -> Result<Option<Selection<R::V>>, SelectError> {
    for alternative in slot
        .admissible(context)
        .filter(|alternative| alternative.repo_kind() == repo.repo_type())
    {
        if let Some(selection) = select(repo, alternative)? {
            return Ok(Some(selection));
        }
    }
    Ok(None)
}

// OfflineRepo #################################################################

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OfflinePackage {
    envs: Vec<String>,
    depend: Vec<DependencySlot>,
}

/// A basic implementation of [Repo] holding every package in memory.
#[derive(Debug, Clone)]
pub struct OfflineRepo<V> {
    repo_type: String,
    env_spec: EnvSpec,
    context: Deployability,
    packages: Map<String, BTreeMap<V, OfflinePackage>>,
}

impl<V: Version> OfflineRepo<V> {
    /// Creates an empty repository serving `repo_type` references.
    pub fn new(repo_type: impl Into<String>) -> Self {
        Self {
            repo_type: repo_type.into(),
            env_spec: EnvSpec::default(),
            context: Deployability::default(),
            packages: Map::default(),
        }
    }

    /// Set the environment preferences.
    pub fn with_env_spec(mut self, env_spec: EnvSpec) -> Self {
        self.env_spec = env_spec;
        self
    }

    /// Registers a package version with its environments and dependencies.
    /// Registering the same version again replaces it.
    pub fn add_package<E, S, D>(
        &mut self,
        name: impl Into<String>,
        version: impl Into<V>,
        envs: E,
        depend: D,
    ) where
        E: IntoIterator<Item = S>,
        S: Into<String>,
        D: IntoIterator<Item = DependencySlot>,
    {
        let package = OfflinePackage {
            envs: envs.into_iter().map(Into::into).collect(),
            depend: depend.into_iter().collect(),
        };
        self.packages
            .entry(name.into())
            .or_default()
            .insert(version.into(), package);
    }

    /// Lists packages that have been registered.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Dependencies of a registered package version.
    pub fn dependencies(&self, name: &str, version: &V) -> Option<&[DependencySlot]> {
        self.package(name, version)
            .map(|package| package.depend.as_slice())
    }

    /// Deployment context received by [Repo::init].
    pub fn context(&self) -> &Deployability {
        &self.context
    }

    fn package(&self, name: &str, version: &V) -> Option<&OfflinePackage> {
        self.packages.get(name)?.get(version)
    }
}

/// Versions are listed with the newest versions first.
impl<V: Version> Repo for OfflineRepo<V> {
    type V = V;

    fn repo_type(&self) -> &str {
        &self.repo_type
    }

    fn init(&mut self, context: &Deployability) -> RepoResult<()> {
        log::debug!("{} repository deploys to {}", self.repo_type, context.to_json());
        self.context = context.clone();
        Ok(())
    }

    fn env_spec(&self) -> EnvSpec {
        self.env_spec.clone()
    }

    fn versions(&self, name: &str) -> RepoResult<Vec<V>> {
        Ok(self
            .packages
            .get(name)
            .map(|versions| versions.keys().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn envs(&self, name: &str, version: &V) -> RepoResult<Vec<String>> {
        Ok(self
            .package(name, version)
            .map(|package| package.envs.clone())
            .unwrap_or_default())
    }

    fn fabricate(
        &self,
        name: &str,
        version: &V,
        envs: &[String],
        dest_dir: &Path,
    ) -> RepoResult<Fabrication> {
        let package = self
            .package(name, version)
            .ok_or_else(|| format!("unknown package {name} {version}"))?;
        let mut blueprint = Blueprint::new(self.repo_type.as_str(), name, version.to_string());
        blueprint.environment = envs
            .first()
            .map_or(DEFAULT_ENVIRONMENT, String::as_str)
            .to_string();
        blueprint.depend = package.depend.clone();
        blueprint.context = self.context.clone();

        let manifest = dest_dir.join(blueprint.file_name());
        blueprint.save(&manifest)?;
        Ok(Fabrication {
            artifacts: Vec::new(),
            manifests: vec![manifest],
            content_type: "text/plain".to_string(),
        })
    }
}
