//! Advisory diagnostics raised while resolving module state.
//!
//! Diagnostics never stop resolution. Warnings are informational; errors only
//! influence the caller's success signal.

use std::fmt;

use serde::{Serialize, Serializer};

/// A warning or error attached to a module or to the whole collection.
///
/// The `Display` form is the exact text written to artifacts.
///
/// # Examples
///
/// ```
/// use module_manifest_core::Diagnostic;
///
/// let diag = Diagnostic::MissingDependencies {
///     key: "MODULE_A".into(),
///     missing: vec!["MODULE_B".into(), "MODULE_C".into()],
/// };
/// assert_eq!(diag.to_string(), "MODULE_A requires modules: MODULE_B, MODULE_C");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A blocked module was toggled on.
    Blocked {
        /// Module key.
        key: String,
        /// Reason from the manifest, if any.
        reason: Option<String>,
    },
    /// An effectively enabled module requires modules that are not.
    MissingDependencies {
        /// Module key.
        key: String,
        /// Required keys that are absent or not effectively enabled.
        missing: Vec<String>,
    },
    /// The toggle file defines a module key the manifest does not know.
    UnknownToggle {
        /// Toggle key.
        key: String,
    },
    /// A manifest module has no toggle in any source.
    UndeclaredToggle {
        /// Module key.
        key: String,
    },
}

impl Diagnostic {
    /// Key of the module or toggle the diagnostic is about.
    pub fn key(&self) -> &str {
        match self {
            Self::Blocked { key, .. }
            | Self::MissingDependencies { key, .. }
            | Self::UnknownToggle { key }
            | Self::UndeclaredToggle { key } => key,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked { key, reason } => write!(
                f,
                "{key} is blocked: {}",
                reason.as_deref().unwrap_or("blocked in manifest")
            ),
            Self::MissingDependencies { key, missing } => {
                let noun = if missing.len() > 1 { "modules" } else { "module" };
                write!(f, "{key} requires {noun}: {}", missing.join(", "))
            }
            Self::UnknownToggle { key } => {
                write!(f, ".env defines {key} but it is missing from the manifest")
            }
            Self::UndeclaredToggle { key } => write!(
                f,
                "Manifest includes {key} but .env does not define it (defaulting to 0)"
            ),
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_message_uses_reason() {
        let diag = Diagnostic::Blocked {
            key: "MODULE_X".into(),
            reason: Some("crashes on startup".into()),
        };
        assert_eq!(diag.to_string(), "MODULE_X is blocked: crashes on startup");
    }

    #[test]
    fn test_blocked_message_without_reason() {
        let diag = Diagnostic::Blocked {
            key: "MODULE_X".into(),
            reason: None,
        };
        assert_eq!(diag.to_string(), "MODULE_X is blocked: blocked in manifest");
    }

    #[test]
    fn test_missing_dependency_singular() {
        let diag = Diagnostic::MissingDependencies {
            key: "MODULE_A".into(),
            missing: vec!["MODULE_B".into()],
        };
        assert_eq!(diag.to_string(), "MODULE_A requires module: MODULE_B");
    }

    #[test]
    fn test_coverage_messages() {
        let unknown = Diagnostic::UnknownToggle {
            key: "MODULE_GHOST".into(),
        };
        assert_eq!(
            unknown.to_string(),
            ".env defines MODULE_GHOST but it is missing from the manifest"
        );

        let undeclared = Diagnostic::UndeclaredToggle {
            key: "MODULE_A".into(),
        };
        assert_eq!(
            undeclared.to_string(),
            "Manifest includes MODULE_A but .env does not define it (defaulting to 0)"
        );
    }

    #[test]
    fn test_serializes_as_message() {
        let diag = Diagnostic::UnknownToggle {
            key: "MODULE_GHOST".into(),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(
            json,
            serde_json::json!(".env defines MODULE_GHOST but it is missing from the manifest")
        );
    }
}
