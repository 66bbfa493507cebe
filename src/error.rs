// SPDX-License-Identifier: MPL-2.0

//! Handling prefab errors.
//!
//! Every error here is local: the caller decides whether to retry, try another alternative,
//! or give up on one branch of a dependency tree.

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors comparing versions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Versions from two ordering families have no common order.
    #[error("cannot compare a {left} version with a {right} version")]
    KindMismatch {
        /// Family of the left-hand version.
        left: &'static str,
        /// Family of the right-hand version.
        right: &'static str,
    },
}

/// Errors decoding a constraint from a specifier or from JSON.
#[derive(Error, Debug)]
pub enum ConstraintError {
    /// A comparator holds a version the ordering family cannot parse.
    #[error("invalid version '{text}' in specifier '{specifier}': {reason}")]
    InvalidVersion {
        /// The whole specifier.
        specifier: String,
        /// The version text.
        text: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A comparator is missing between separators.
    #[error("empty term in specifier '{specifier}'")]
    EmptyTerm {
        /// The whole specifier.
        specifier: String,
    },
    /// The JSON document does not describe a constraint.
    #[error("invalid constraint JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors building or parsing a prefab reference.
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// The text does not follow `[Kind] Name [Specifier] {deployability}`.
    #[error("malformed prefab reference '{text}': {reason}")]
    Malformed {
        /// The offending text.
        text: String,
        /// What is missing.
        reason: &'static str,
    },
    /// A field cannot be encoded without ambiguity.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The deployability block is not a JSON object of strings.
    #[error("invalid deployability block '{text}': {source}")]
    Deployability {
        /// The unescaped block content.
        text: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Errors decoding or storing a blueprint.
#[derive(Error, Debug)]
pub enum BlueprintError {
    /// A tag header names no known tag.
    #[error("line {line}: unknown tag [{tag}]")]
    UnknownTag {
        /// 1-based line number.
        line: usize,
        /// The tag as written.
        tag: String,
    },
    /// A line is neither a tag, an item, a comment nor blank.
    #[error("line {line}: malformed line '{text}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The line as written.
        text: String,
    },
    /// An item line does not belong to the current tag.
    #[error("line {line}: item does not belong to a list")]
    UnexpectedItem {
        /// 1-based line number.
        line: usize,
    },
    /// A list header carries an inline value.
    #[error("line {line}: tag [{tag}] takes no inline value")]
    UnexpectedValue {
        /// 1-based line number.
        line: usize,
        /// The list tag.
        tag: &'static str,
    },
    /// The protocol version is not a positive integer.
    #[error("line {line}: invalid protocol version '{text}'")]
    InvalidProtocol {
        /// 1-based line number.
        line: usize,
        /// The value as written.
        text: String,
    },
    /// The protocol version is newer than this decoder.
    #[error("line {line}: protocol version {version} is newer than the supported {supported}")]
    UnsupportedProtocol {
        /// 1-based line number.
        line: usize,
        /// Version found.
        version: u32,
        /// Highest version supported.
        supported: u32,
    },
    /// An environment variable item lacks a name or the `=` separator.
    #[error("line {line}: environment variable '{text}' is not NAME=VALUE")]
    InvalidEnvVar {
        /// 1-based line number.
        line: usize,
        /// The item as written.
        text: String,
    },
    /// A dependency item is not a valid prefab reference.
    #[error("line {line}: {source}")]
    Reference {
        /// 1-based line number.
        line: usize,
        /// Underlying reference error.
        source: ReferenceError,
    },
    /// The context payload is not a JSON object of strings.
    #[error("line {line}: invalid context payload: {source}")]
    Context {
        /// 1-based line number.
        line: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A value cannot be written as a blueprint line.
    #[error("value {text:?} under [{tag}] {reason}")]
    InvalidValue {
        /// Tag the value belongs to.
        tag: &'static str,
        /// The offending value.
        text: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Reading or writing a blueprint file failed.
    #[error("cannot access blueprint file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Errors that may occur while selecting a prefab from a repository.
#[derive(Error, Debug)]
pub enum SelectError {
    /// The reference targets another kind of repository.
    #[error("reference of kind {reference_kind} cannot be selected from a {repo_type} repository")]
    RepoMismatch {
        /// Kind named by the reference.
        reference_kind: String,
        /// Kind served by the repository.
        repo_type: String,
    },

    /// The reference specifier does not decode into a constraint.
    #[error("invalid specifier for {package}")]
    Specifier {
        /// Package being selected.
        package: String,
        /// Underlying constraint error.
        source: ConstraintError,
    },

    /// Error arising when the repository failed to list versions.
    #[error("Retrieving available versions of package {package} failed")]
    ErrorRetrievingVersions {
        /// Package for which we want the list of versions.
        package: String,
        /// Error raised by the repository.
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Error arising when the repository failed to list environments.
    #[error("Retrieving environments of {package} {version} failed")]
    ErrorRetrievingEnvs {
        /// Package whose environments we want.
        package: String,
        /// Version of the package.
        version: String,
        /// Error raised by the repository.
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The repository asked for the selection to stop.
    #[error("Selection was cancelled")]
    ErrorShouldCancel(#[source] Box<dyn StdError + Send + Sync>),
}
