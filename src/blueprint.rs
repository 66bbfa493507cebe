// SPDX-License-Identifier: MPL-2.0

//! Blueprints: the manifest shipped next to a prefab, and its line-oriented text form.
//!
//! ```text
//! [BLUEPRINT] 1
//! [TYPE] Apt
//! [NAME] curl
//! [VERSION] 7.88.1
//! [ENVIRONMENT] amd64
//! [WORKDIR] /opt/curl
//! [ENVVAR]
//! - LANG=C
//! [ENTRYPOINT]
//! - /usr/bin/curl
//! [DEPEND]
//! - [Apt] libssl [>=1.1]
//! - [Apt] libcurl4 [any]
//! | [Apt] libcurl3 [any]
//! [CONTEXT] {"arch":"amd64"}
//! ```
//!
//! Scalar tags hold their value on the tag line. List tags are followed by one `- ` item per
//! element. Under `[DEPEND]` each `- ` item opens a dependency slot and each `| ` item adds an
//! alternative to the slot above it. Lines starting with `//` are comments.
//!
//! Values are kept verbatim: decoding strips the single space after `]`, `-` or `|` and
//! nothing else. Values holding a line break cannot be written, and neither can empty list
//! items or environment variable names that are empty or contain `=`.

use std::fmt::{self, Display};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::deployability::Deployability;
use crate::error::BlueprintError;
use crate::reference::PrefabReference;

/// Newest blueprint protocol this crate reads and the one it writes.
pub const BLUEPRINT_PROTOCOL_VERSION: u32 = 1;

/// Environment of a prefab that runs anywhere.
pub const DEFAULT_ENVIRONMENT: &str = "any";

/// File extension of blueprint files.
pub const BLUEPRINT_EXTENSION: &str = "blueprint";

/// An environment variable set when running the prefab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,
    /// Variable value, possibly empty.
    pub value: String,
}

impl EnvVar {
    /// Create a variable.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// One dependency of a blueprint, satisfied by any of its alternatives.
///
/// A slot always holds at least one alternative, in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySlot {
    alternatives: Vec<PrefabReference>,
}

impl DependencySlot {
    /// Slot with a single alternative.
    pub fn new(first: PrefabReference) -> Self {
        Self {
            alternatives: vec![first],
        }
    }

    /// Builder flavour of [push_alternative](Self::push_alternative).
    pub fn or(mut self, alternative: PrefabReference) -> Self {
        self.push_alternative(alternative);
        self
    }

    /// Add a less preferred alternative.
    pub fn push_alternative(&mut self, alternative: PrefabReference) {
        self.alternatives.push(alternative);
    }

    /// Alternatives in preference order.
    pub fn alternatives(&self) -> &[PrefabReference] {
        &self.alternatives
    }

    /// Preferred alternative.
    pub fn first(&self) -> &PrefabReference {
        &self.alternatives[0]
    }

    /// Alternatives applying to a target described by `context`, in preference order.
    pub fn admissible<'a>(
        &'a self,
        context: &'a Deployability,
    ) -> impl Iterator<Item = &'a PrefabReference> + 'a {
        self.alternatives
            .iter()
            .filter(move |reference| reference.admits(context))
    }
}

/// Manifest describing a prefab: what it is, how to run it, and what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    /// Protocol version the blueprint was written with.
    pub protocol: u32,
    /// Repository kind the prefab was fabricated from.
    pub prefab_type: String,
    /// Package name.
    pub name: String,
    /// Package version, as text.
    pub version: String,
    /// Environment tag, [DEFAULT_ENVIRONMENT] when it runs anywhere.
    pub environment: String,
    /// User to run as.
    pub user: Option<String>,
    /// Working directory when running.
    pub work_dir: Option<String>,
    /// Directory the artifact is unpacked into.
    pub target_dir: Option<String>,
    /// Environment variables, in order.
    pub env_vars: Vec<EnvVar>,
    /// Entry point, program first.
    pub entry_point: Vec<String>,
    /// Default arguments.
    pub command: Vec<String>,
    /// Dependencies: every slot must be satisfied, by any one of its alternatives.
    pub depend: Vec<DependencySlot>,
    /// Facts about the target the prefab was built for.
    pub context: Deployability,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            protocol: BLUEPRINT_PROTOCOL_VERSION,
            prefab_type: String::new(),
            name: String::new(),
            version: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            user: None,
            work_dir: None,
            target_dir: None,
            env_vars: Vec::new(),
            entry_point: Vec::new(),
            command: Vec::new(),
            depend: Vec::new(),
            context: Deployability::default(),
        }
    }
}

/// Something odd but harmless found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// A list item with no content was skipped.
    EmptyItem {
        /// 1-based line number.
        line: usize,
        /// Tag the item was listed under.
        tag: &'static str,
    },
}

impl Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyItem { line, tag } => {
                write!(f, "line {line}: skipped empty item under [{tag}]")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Blueprint,
    Type,
    Name,
    Version,
    Environment,
    User,
    WorkDir,
    TargetDir,
    EnvVar,
    EntryPoint,
    Cmd,
    Depend,
    Context,
}

impl Tag {
    const ALL: [Tag; 13] = [
        Tag::Blueprint,
        Tag::Type,
        Tag::Name,
        Tag::Version,
        Tag::Environment,
        Tag::User,
        Tag::WorkDir,
        Tag::TargetDir,
        Tag::EnvVar,
        Tag::EntryPoint,
        Tag::Cmd,
        Tag::Depend,
        Tag::Context,
    ];

    fn name(self) -> &'static str {
        match self {
            Tag::Blueprint => "BLUEPRINT",
            Tag::Type => "TYPE",
            Tag::Name => "NAME",
            Tag::Version => "VERSION",
            Tag::Environment => "ENVIRONMENT",
            Tag::User => "USER",
            Tag::WorkDir => "WORKDIR",
            Tag::TargetDir => "TARGETDIR",
            Tag::EnvVar => "ENVVAR",
            Tag::EntryPoint => "ENTRYPOINT",
            Tag::Cmd => "CMD",
            Tag::Depend => "DEPEND",
            Tag::Context => "CONTEXT",
        }
    }

    fn from_name(name: &str) -> Option<Tag> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }

    fn is_list(self) -> bool {
        matches!(self, Tag::EnvVar | Tag::EntryPoint | Tag::Cmd | Tag::Depend)
    }
}

impl Blueprint {
    /// Blueprint of a package, everything else at its default.
    pub fn new(
        prefab_type: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            prefab_type: prefab_type.into(),
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// File name of this blueprint: `<name>.blueprint`.
    pub fn file_name(&self) -> String {
        format!("{}.{BLUEPRINT_EXTENSION}", self.name)
    }

    /// Text form of the blueprint, after checking that every value fits on its line.
    pub fn encode(&self) -> Result<String, BlueprintError> {
        self.check()?;
        Ok(self.to_string())
    }

    /// Decode a blueprint, logging non-fatal findings.
    pub fn decode(text: &str) -> Result<Self, BlueprintError> {
        let (blueprint, warnings) = Self::decode_with_warnings(text)?;
        for warning in &warnings {
            log::warn!("blueprint {}: {warning}", blueprint.name);
        }
        Ok(blueprint)
    }

    /// Decode a blueprint and return the non-fatal findings next to it.
    pub fn decode_with_warnings(text: &str) -> Result<(Self, Vec<DecodeWarning>), BlueprintError> {
        let mut decoder = Decoder::default();
        for (index, line) in text.lines().enumerate() {
            decoder.line(index + 1, line)?;
        }
        log::debug!(
            "decoded blueprint {} {} with {} dependency slots",
            decoder.blueprint.name,
            decoder.blueprint.version,
            decoder.blueprint.depend.len()
        );
        Ok((decoder.blueprint, decoder.warnings))
    }

    /// Read and decode a blueprint file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlueprintError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BlueprintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(&text)
    }

    /// Encode and write a blueprint file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BlueprintError> {
        let path = path.as_ref();
        fs::write(path, self.encode()?).map_err(|source| BlueprintError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl FromStr for Blueprint {
    type Err = BlueprintError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::decode(text)
    }
}

// ENCODING ####################################################################

fn invalid(tag: Tag, text: impl Display, reason: &'static str) -> BlueprintError {
    BlueprintError::InvalidValue {
        tag: tag.name(),
        text: text.to_string(),
        reason,
    }
}

fn check_line(tag: Tag, value: &str) -> Result<(), BlueprintError> {
    if value.contains(['\n', '\r']) {
        return Err(invalid(tag, value, "contains a line break"));
    }
    Ok(())
}

fn check_item(tag: Tag, item: &str) -> Result<(), BlueprintError> {
    if item.is_empty() {
        return Err(invalid(tag, item, "is an empty item"));
    }
    check_line(tag, item)
}

impl Blueprint {
    fn check(&self) -> Result<(), BlueprintError> {
        for (tag, value) in [
            (Tag::Type, Some(&self.prefab_type)),
            (Tag::Name, Some(&self.name)),
            (Tag::Version, Some(&self.version)),
            (Tag::Environment, Some(&self.environment)),
            (Tag::User, self.user.as_ref()),
            (Tag::WorkDir, self.work_dir.as_ref()),
            (Tag::TargetDir, self.target_dir.as_ref()),
        ] {
            if let Some(value) = value {
                check_line(tag, value)?;
            }
        }
        // An empty environment would decode as the default one.
        if self.environment.is_empty() {
            return Err(invalid(Tag::Environment, "", "is empty"));
        }
        for var in &self.env_vars {
            if var.key.is_empty() || var.key.contains('=') {
                return Err(invalid(Tag::EnvVar, var, "has a name that is empty or holds '='"));
            }
            check_line(Tag::EnvVar, &var.key)?;
            check_line(Tag::EnvVar, &var.value)?;
        }
        for (tag, items) in [(Tag::EntryPoint, &self.entry_point), (Tag::Cmd, &self.command)] {
            for item in items {
                check_item(tag, item)?;
            }
        }
        for slot in &self.depend {
            for alternative in &slot.alternatives {
                check_line(Tag::Depend, &alternative.to_string())?;
            }
        }
        Ok(())
    }
}

fn write_scalar(f: &mut fmt::Formatter<'_>, tag: Tag, value: &str) -> fmt::Result {
    if value.is_empty() {
        writeln!(f, "[{}]", tag.name())
    } else {
        writeln!(f, "[{}] {value}", tag.name())
    }
}

fn write_list<T: Display>(f: &mut fmt::Formatter<'_>, tag: Tag, items: &[T]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "[{}]", tag.name())?;
    for item in items {
        writeln!(f, "- {item}")?;
    }
    Ok(())
}

/// Renders the text form without checking values; [Blueprint::encode] checks them first.
impl Display for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_scalar(f, Tag::Blueprint, &self.protocol.to_string())?;
        for (tag, value) in [
            (Tag::Type, &self.prefab_type),
            (Tag::Name, &self.name),
            (Tag::Version, &self.version),
        ] {
            if !value.is_empty() {
                write_scalar(f, tag, value)?;
            }
        }
        if self.environment != DEFAULT_ENVIRONMENT && !self.environment.is_empty() {
            write_scalar(f, Tag::Environment, &self.environment)?;
        }
        for (tag, value) in [
            (Tag::User, &self.user),
            (Tag::WorkDir, &self.work_dir),
            (Tag::TargetDir, &self.target_dir),
        ] {
            if let Some(value) = value {
                write_scalar(f, tag, value)?;
            }
        }
        write_list(f, Tag::EnvVar, &self.env_vars)?;
        write_list(f, Tag::EntryPoint, &self.entry_point)?;
        write_list(f, Tag::Cmd, &self.command)?;
        if !self.depend.is_empty() {
            writeln!(f, "[{}]", Tag::Depend.name())?;
            for slot in &self.depend {
                for (index, alternative) in slot.alternatives.iter().enumerate() {
                    let marker = if index == 0 { '-' } else { '|' };
                    writeln!(f, "{marker} {alternative}")?;
                }
            }
        }
        if !self.context.is_empty() {
            write_scalar(f, Tag::Context, &self.context.to_json())?;
        }
        Ok(())
    }
}

// DECODING ####################################################################

#[derive(Default)]
struct Decoder {
    blueprint: Blueprint,
    warnings: Vec<DecodeWarning>,
    current: Option<Tag>,
}

impl Decoder {
    fn line(&mut self, line: usize, text: &str) -> Result<(), BlueprintError> {
        let text = text.trim_start();
        if text.trim_end().is_empty() || text.starts_with("//") {
            return Ok(());
        }
        if let Some(rest) = text.strip_prefix('[') {
            let (name, value) = rest
                .split_once(']')
                .ok_or_else(|| BlueprintError::MalformedLine {
                    line,
                    text: text.to_string(),
                })?;
            let tag = Tag::from_name(name.trim()).ok_or_else(|| BlueprintError::UnknownTag {
                line,
                tag: name.trim().to_string(),
            })?;
            self.current = Some(tag);
            return self.header(line, tag, after_marker(value));
        }
        let (opens_slot, item) = if let Some(item) = text.strip_prefix('-') {
            (true, after_marker(item))
        } else if let Some(item) = text.strip_prefix('|') {
            (false, after_marker(item))
        } else {
            return Err(BlueprintError::MalformedLine {
                line,
                text: text.to_string(),
            });
        };
        self.item(line, opens_slot, item)
    }

    fn header(&mut self, line: usize, tag: Tag, value: &str) -> Result<(), BlueprintError> {
        let blueprint = &mut self.blueprint;
        match tag {
            Tag::Blueprint => {
                let value = value.trim();
                if !value.is_empty() {
                    blueprint.protocol = parse_protocol(line, value)?;
                }
            }
            Tag::Type => blueprint.prefab_type = value.to_string(),
            Tag::Name => blueprint.name = value.to_string(),
            Tag::Version => blueprint.version = value.to_string(),
            Tag::Environment => {
                blueprint.environment = if value.is_empty() {
                    DEFAULT_ENVIRONMENT.to_string()
                } else {
                    value.to_string()
                }
            }
            Tag::User => blueprint.user = Some(value.to_string()),
            Tag::WorkDir => blueprint.work_dir = Some(value.to_string()),
            Tag::TargetDir => blueprint.target_dir = Some(value.to_string()),
            Tag::Context => {
                blueprint.context = if value.trim().is_empty() {
                    Deployability::default()
                } else {
                    Deployability::from_json(value)
                        .map_err(|source| BlueprintError::Context { line, source })?
                }
            }
            Tag::EnvVar | Tag::EntryPoint | Tag::Cmd | Tag::Depend => {
                if !value.trim().is_empty() {
                    return Err(BlueprintError::UnexpectedValue {
                        line,
                        tag: tag.name(),
                    });
                }
            }
        }
        Ok(())
    }

    fn item(&mut self, line: usize, opens_slot: bool, item: &str) -> Result<(), BlueprintError> {
        let tag = match self.current {
            Some(tag) if tag.is_list() => tag,
            _ => return Err(BlueprintError::UnexpectedItem { line }),
        };
        if !opens_slot && tag != Tag::Depend {
            return Err(BlueprintError::UnexpectedItem { line });
        }
        if item.is_empty() {
            self.warnings.push(DecodeWarning::EmptyItem {
                line,
                tag: tag.name(),
            });
            return Ok(());
        }
        let blueprint = &mut self.blueprint;
        match tag {
            Tag::EnvVar => {
                let (key, value) = item
                    .split_once('=')
                    .filter(|(key, _)| !key.is_empty())
                    .ok_or_else(|| BlueprintError::InvalidEnvVar {
                        line,
                        text: item.to_string(),
                    })?;
                blueprint.env_vars.push(EnvVar::new(key, value));
            }
            Tag::EntryPoint => blueprint.entry_point.push(item.to_string()),
            Tag::Cmd => blueprint.command.push(item.to_string()),
            _ => {
                let reference = item
                    .parse::<PrefabReference>()
                    .map_err(|source| BlueprintError::Reference { line, source })?;
                if opens_slot {
                    blueprint.depend.push(DependencySlot::new(reference));
                } else {
                    blueprint
                        .depend
                        .last_mut()
                        .ok_or(BlueprintError::UnexpectedItem { line })?
                        .push_alternative(reference);
                }
            }
        }
        Ok(())
    }
}

/// The value after a tag or item marker, without the one separating space.
fn after_marker(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

fn parse_protocol(line: usize, value: &str) -> Result<u32, BlueprintError> {
    let invalid = || BlueprintError::InvalidProtocol {
        line,
        text: value.to_string(),
    };
    let version: u32 = value.parse().map_err(|_| invalid())?;
    if version == 0 {
        return Err(invalid());
    }
    if version > BLUEPRINT_PROTOCOL_VERSION {
        return Err(BlueprintError::UnsupportedProtocol {
            line,
            version,
            supported: BLUEPRINT_PROTOCOL_VERSION,
        });
    }
    Ok(version)
}
