//! Module type definitions for manifest and runtime state modeling.
//!
//! [`ModuleDeclaration`] is the immutable, validated form of one manifest
//! entry. [`ModuleState`] is the per-invocation record derived from a
//! declaration and the toggle sources; [`ModuleCollectionState`] holds every
//! record in declaration order together with the flattened diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::Diagnostic;

/// Key of the module whose enablement switches the build to the playerbot
/// source tree.
pub const PLAYERBOTS_MODULE_KEY: &str = "MODULE_PLAYERBOTS";

/// Prefix shared by every module toggle key.
pub const MODULE_KEY_PREFIX: &str = "MODULE_";

/// Canonical database categories recognised by SQL discovery.
pub const SQL_CATEGORIES: [&str; 4] = ["db_auth", "db_world", "db_characters", "db_playerbots"];

/// SQL files found for a module, keyed by canonical database category.
///
/// Paths are relative to the module root and use `/` separators.
pub type SqlFileMap = BTreeMap<String, Vec<String>>;

/// Kind of module, as declared by the manifest `type` field.
///
/// Parsing is case-insensitive but otherwise exact: surrounding whitespace
/// is significant, so `" cpp"` is not [`ModuleType::Cpp`]. Unrecognised
/// values are preserved in [`ModuleType::Other`].
///
/// # Examples
///
/// ```
/// use module_manifest_core::ModuleType;
///
/// assert_eq!(ModuleType::parse("CPP"), ModuleType::Cpp);
/// assert!(ModuleType::Cpp.default_needs_build());
/// assert!(!ModuleType::Lua.default_needs_build());
/// assert_eq!(ModuleType::parse("bundle").as_str(), "bundle");
/// assert_eq!(ModuleType::parse(" cpp"), ModuleType::Other(" cpp".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModuleType {
    /// Native C++ module compiled into the server (the default).
    #[default]
    Cpp,
    /// Lua scripts loaded by a scripting engine.
    Lua,
    /// SQL-only content.
    Sql,
    /// Auxiliary tool shipped alongside the server.
    Tool,
    /// Data files (maps, DBC overrides, ...).
    Data,
    /// Any other declared type, kept verbatim.
    Other(String),
}

impl ModuleType {
    /// Parses a manifest `type` value.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "cpp" => Self::Cpp,
            "lua" => Self::Lua,
            "sql" => Self::Sql,
            "tool" => Self::Tool,
            "data" => Self::Data,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Returns the textual form used in artifacts.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cpp => "cpp",
            Self::Lua => "lua",
            Self::Sql => "sql",
            Self::Tool => "tool",
            Self::Data => "data",
            Self::Other(raw) => raw,
        }
    }

    /// Whether a module of this type needs a native build when the manifest
    /// does not say otherwise.
    pub fn default_needs_build(&self) -> bool {
        matches!(self, Self::Cpp)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ModuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Administrative status of a module.
///
/// Only [`ModuleStatus::Blocked`] has an effect on resolution; everything else
/// is carried through to the artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModuleStatus {
    /// Normal, usable module (the default).
    #[default]
    Active,
    /// Disabled regardless of its toggle.
    Blocked,
    /// Any other declared status, kept verbatim.
    Other(String),
}

impl ModuleStatus {
    /// Parses a manifest `status` value (case-insensitive, whitespace kept).
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "active" => Self::Active,
            "blocked" => Self::Blocked,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Returns the textual form used in artifacts.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` for [`ModuleStatus::Blocked`].
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ModuleStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A validated manifest entry.
///
/// Produced by [`validate_manifest`](crate::validate_manifest); never mutated
/// afterwards. Derived values such as the effective `needs_build` flag are
/// computed by pure methods instead of being patched in place.
///
/// # Examples
///
/// ```
/// use module_manifest_core::{ModuleDeclaration, ModuleType};
///
/// let decl = ModuleDeclaration::new("MODULE_ELUNA", "mod-eluna", "https://example.invalid/eluna");
/// assert!(decl.resolved_needs_build());
///
/// let scripts = decl.clone().with_type(ModuleType::Lua);
/// assert!(!scripts.resolved_needs_build());
///
/// let forced = scripts.with_needs_build(true);
/// assert!(forced.resolved_needs_build());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDeclaration {
    /// Unique toggle key (e.g. `MODULE_ELUNA`).
    pub key: String,
    /// Module name; also the directory name of staged sources.
    pub name: String,
    /// Source repository URL.
    pub repo: String,
    /// Declared module kind.
    pub module_type: ModuleType,
    /// Explicit build override. `None` means "derive from `module_type`".
    pub needs_build: Option<bool>,
    /// Keys of modules that must also be effectively enabled.
    pub requires: Vec<String>,
    /// Administrative status.
    pub status: ModuleStatus,
    /// Human-readable reason attached to a blocked status.
    pub block_reason: Option<String>,
    /// Opaque hook identifiers run after staging.
    pub post_install_hooks: Vec<String>,
    /// Config patterns removed when the module is disabled.
    pub config_cleanup: Vec<String>,
    /// SQL descriptor, passed through untouched.
    pub sql: Option<serde_json::Value>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Pinned source revision.
    pub git_ref: Option<String>,
    /// `type` exactly as written in the manifest.
    pub(crate) declared_type: Option<String>,
    /// `status` exactly as written in the manifest.
    pub(crate) declared_status: Option<String>,
}

impl ModuleDeclaration {
    /// Creates a declaration with the required fields and defaults elsewhere.
    pub fn new(key: impl Into<String>, name: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            repo: repo.into(),
            module_type: ModuleType::default(),
            needs_build: None,
            requires: Vec::new(),
            status: ModuleStatus::default(),
            block_reason: None,
            post_install_hooks: Vec::new(),
            config_cleanup: Vec::new(),
            sql: None,
            notes: None,
            git_ref: None,
            declared_type: None,
            declared_status: None,
        }
    }

    /// Sets the module type.
    pub fn with_type(mut self, module_type: ModuleType) -> Self {
        self.module_type = module_type;
        self.declared_type = None;
        self
    }

    /// Sets an explicit build override.
    pub fn with_needs_build(mut self, needs_build: bool) -> Self {
        self.needs_build = Some(needs_build);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: ModuleStatus) -> Self {
        self.status = status;
        self.declared_status = None;
        self
    }

    /// Sets the block reason.
    pub fn with_block_reason(mut self, reason: impl Into<String>) -> Self {
        self.block_reason = Some(reason.into());
        self
    }

    /// Adds a required module key.
    pub fn with_requirement(mut self, key: impl Into<String>) -> Self {
        self.requires.push(key.into());
        self
    }

    /// Returns the explicit `needs_build` flag when present, otherwise the
    /// default for the module type.
    pub fn resolved_needs_build(&self) -> bool {
        self.needs_build
            .unwrap_or_else(|| self.module_type.default_needs_build())
    }

    /// Returns `true` when the status is blocked.
    pub fn is_blocked(&self) -> bool {
        self.status.is_blocked()
    }

    /// The `type` text echoed into artifacts: the manifest spelling when one
    /// was given, otherwise the canonical name.
    ///
    /// ```
    /// use module_manifest_core::validate_manifest;
    /// use serde_json::json;
    ///
    /// let manifest = json!({
    ///     "modules": [{ "key": "MODULE_A", "name": "a", "repo": "u", "type": "LUA" }]
    /// });
    /// let decl = &validate_manifest(&manifest).unwrap()[0];
    /// assert_eq!(decl.type_text(), "LUA");
    /// assert_eq!(decl.status_text(), "active");
    /// ```
    pub fn type_text(&self) -> &str {
        self.declared_type
            .as_deref()
            .unwrap_or_else(|| self.module_type.as_str())
    }

    /// The `status` text echoed into artifacts.
    pub fn status_text(&self) -> &str {
        self.declared_status
            .as_deref()
            .unwrap_or_else(|| self.status.as_str())
    }
}

/// Runtime record for one module, derived from its declaration and toggles.
///
/// `enabled_effective` is always `enabled_raw && !blocked`. Dependency errors
/// are recorded in `errors` but do not clear `enabled_effective`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleState {
    /// The source declaration.
    pub declaration: ModuleDeclaration,
    /// Resolved build requirement.
    pub needs_build: bool,
    /// Toggle value interpreted as a boolean.
    pub enabled_raw: bool,
    /// Whether the manifest blocks this module.
    pub blocked: bool,
    /// Toggle state after applying the block override.
    pub enabled_effective: bool,
    /// Required keys that are missing or not effectively enabled.
    pub dependency_issues: Vec<String>,
    /// Module-scoped warnings, in the order they were raised.
    pub warnings: Vec<Diagnostic>,
    /// Module-scoped errors, in the order they were raised.
    pub errors: Vec<Diagnostic>,
    /// SQL files discovered in the staged module sources.
    pub sql_files: SqlFileMap,
}

impl ModuleState {
    /// Module key.
    pub fn key(&self) -> &str {
        &self.declaration.key
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// Toggle value echoed into artifacts: `"1"` or `"0"`.
    pub fn value(&self) -> &'static str {
        if self.enabled_effective { "1" } else { "0" }
    }
}

/// The complete resolution result for one invocation.
#[derive(Debug, Clone)]
pub struct ModuleCollectionState {
    /// One record per declaration, in manifest order.
    pub modules: Vec<ModuleState>,
    /// When the state was computed.
    pub generated_at: DateTime<Utc>,
    /// Manifest the declarations were read from.
    pub manifest_path: PathBuf,
    /// Toggle file the toggles were read from.
    pub env_path: PathBuf,
    /// Every module warning followed by the coverage warnings.
    pub warnings: Vec<Diagnostic>,
    /// Every module error.
    pub errors: Vec<Diagnostic>,
}
