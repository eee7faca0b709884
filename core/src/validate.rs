//! Manifest schema validation.
//!
//! Turns a parsed manifest document into typed [`ModuleDeclaration`]s, or a
//! list of tagged [`ValidationError`]s describing every structural problem.
//! Any validation error is fatal: callers must not build state from a
//! manifest that failed validation.
//!
//! # Examples
//!
//! ```
//! use module_manifest_core::*;
//! use serde_json::json;
//!
//! let manifest = json!({
//!     "modules": [
//!         { "key": "MODULE_A", "name": "mod-a", "repo": "https://example.invalid/a" }
//!     ]
//! });
//! let modules = validate_manifest(&manifest).unwrap();
//! assert_eq!(modules[0].key, "MODULE_A");
//!
//! // Duplicate keys are structural failures.
//! let manifest = json!({
//!     "modules": [
//!         { "key": "MODULE_X", "name": "x", "repo": "u" },
//!         { "key": "MODULE_X", "name": "y", "repo": "u" }
//!     ]
//! });
//! let errors = validate_manifest(&manifest).unwrap_err();
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateKey { .. })));
//! ```

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ModuleDeclaration, ModuleStatus, ModuleType};

/// Manifest validation errors.
///
/// Entries without a usable key are identified by their array index; all
/// other failures name the module key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The document has no top-level `modules` array.
    #[error("manifest must define a top-level 'modules' array")]
    MissingModules,
    /// A `modules` entry is not a JSON object.
    #[error("manifest entry at index {index} must be an object")]
    EntryNotObject {
        /// Position in the `modules` array.
        index: usize,
    },
    /// A `modules` entry has no non-empty string `key`.
    #[error("manifest entry at index {index} missing 'key'")]
    MissingKey {
        /// Position in the `modules` array.
        index: usize,
    },
    /// Two entries share a key.
    #[error("duplicate manifest key detected: '{key}' (at index {index})")]
    DuplicateKey {
        /// The repeated key.
        key: String,
        /// Position of the repeated occurrence.
        index: usize,
    },
    /// A required string field is absent or empty.
    #[error("manifest entry '{key}' missing '{field}' field")]
    MissingField {
        /// Module key.
        key: String,
        /// Field name.
        field: &'static str,
    },
    /// A field is present with an unusable JSON type.
    #[error("manifest entry '{key}' has invalid '{field}' field (expected {expected})")]
    WrongType {
        /// Module key.
        key: String,
        /// Field name.
        field: &'static str,
        /// Description of the accepted shape.
        expected: &'static str,
    },
}

/// Validates a manifest document.
///
/// Every entry is checked so that all structural failures are reported
/// together. An entry whose key is unusable contributes only that failure.
///
/// Field coercion:
/// - `type` and `status` default to `cpp` and `active`.
/// - `needs_build` follows JSON truthiness; `null` means "use the type default".
/// - Scalar string fields accept strings, numbers, and booleans.
/// - List fields accept `null` (empty) or arrays of scalars.
pub fn validate_manifest(
    document: &Value,
) -> Result<Vec<ModuleDeclaration>, Vec<ValidationError>> {
    let Some(entries) = document.get("modules").and_then(Value::as_array) else {
        return Err(vec![ValidationError::MissingModules]);
    };

    let mut errors = Vec::new();
    let mut declarations = Vec::with_capacity(entries.len());
    let mut seen_keys: HashSet<&str> = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(object) = entry.as_object() else {
            errors.push(ValidationError::EntryNotObject { index });
            continue;
        };

        let key = match object.get("key").and_then(Value::as_str) {
            Some(key) if !key.is_empty() => key,
            _ => {
                errors.push(ValidationError::MissingKey { index });
                continue;
            }
        };

        if !seen_keys.insert(key) {
            errors.push(ValidationError::DuplicateKey {
                key: key.to_string(),
                index,
            });
            continue;
        }

        match validate_entry(key, object) {
            Ok(declaration) => declarations.push(declaration),
            Err(entry_errors) => errors.extend(entry_errors),
        }
    }

    if errors.is_empty() {
        Ok(declarations)
    } else {
        Err(errors)
    }
}

fn validate_entry(
    key: &str,
    object: &Map<String, Value>,
) -> Result<ModuleDeclaration, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = required_string(key, object, "name", &mut errors);
    let repo = required_string(key, object, "repo", &mut errors);
    let module_type = optional_string(key, object, "type", &mut errors);
    let status = optional_string(key, object, "status", &mut errors);
    let block_reason = optional_string(key, object, "block_reason", &mut errors);
    let notes = optional_string(key, object, "notes", &mut errors);
    let git_ref = optional_string(key, object, "ref", &mut errors);
    let requires = string_list(key, object, "requires", &mut errors);
    let post_install_hooks = string_list(key, object, "post_install_hooks", &mut errors);
    let config_cleanup = string_list(key, object, "config_cleanup", &mut errors);

    let needs_build = match object.get("needs_build") {
        None | Some(Value::Null) => None,
        Some(value) => Some(json_truthy(value)),
    };

    let sql = match object.get("sql") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.clone()),
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ModuleDeclaration {
        key: key.to_string(),
        name: name.unwrap_or_default(),
        repo: repo.unwrap_or_default(),
        module_type: module_type
            .as_deref()
            .map(ModuleType::parse)
            .unwrap_or_default(),
        needs_build,
        requires,
        status: status
            .as_deref()
            .map(ModuleStatus::parse)
            .unwrap_or_default(),
        block_reason,
        post_install_hooks,
        config_cleanup,
        sql,
        notes,
        git_ref,
        declared_type: module_type,
        declared_status: status,
    })
}

fn required_string(
    key: &str,
    object: &Map<String, Value>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match object.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            errors.push(ValidationError::MissingField {
                key: key.to_string(),
                field,
            });
            None
        }
    }
}

fn optional_string(
    key: &str,
    object: &Map<String, Value>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => match scalar_text(value) {
            Some(text) => Some(text),
            None => {
                errors.push(ValidationError::WrongType {
                    key: key.to_string(),
                    field,
                    expected: "a string",
                });
                None
            }
        },
    }
}

fn string_list(
    key: &str,
    object: &Map<String, Value>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Vec<String> {
    let wrong_type = || ValidationError::WrongType {
        key: key.to_string(),
        field,
        expected: "an array of strings",
    };

    match object.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let texts: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            texts.unwrap_or_else(|| {
                errors.push(wrong_type());
                Vec::new()
            })
        }
        Some(_) => {
            errors.push(wrong_type());
            Vec::new()
        }
    }
}

/// Renders a scalar JSON value as text; `None` for null, arrays, and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_accepts_minimal_entry_with_defaults() {
        let manifest = json!({
            "modules": [{ "key": "MODULE_A", "name": "A", "repo": "u" }]
        });
        let modules = validate_manifest(&manifest).unwrap();
        assert_eq!(modules.len(), 1);
        let module = &modules[0];
        assert_eq!(module.module_type, ModuleType::Cpp);
        assert_eq!(module.status, ModuleStatus::Active);
        assert_eq!(module.needs_build, None);
        assert!(module.requires.is_empty());
        assert!(module.sql.is_none());
    }

    #[test]
    fn test_validate_reads_all_fields() {
        let manifest = json!({
            "modules": [{
                "key": "MODULE_ELUNA_TS",
                "name": "eluna-ts",
                "repo": "https://example.invalid/eluna-ts",
                "type": "tool",
                "needs_build": true,
                "requires": ["MODULE_ELUNA"],
                "status": "Blocked",
                "block_reason": "upstream broken",
                "post_install_hooks": ["npm_install", 3],
                "config_cleanup": ["eluna_ts.conf*"],
                "sql": { "world": ["a.sql"] },
                "ref": "v1.2",
                "notes": "typescript bindings"
            }]
        });
        let modules = validate_manifest(&manifest).unwrap();
        let module = &modules[0];
        assert_eq!(module.module_type, ModuleType::Tool);
        assert_eq!(module.needs_build, Some(true));
        assert_eq!(module.requires, vec!["MODULE_ELUNA"]);
        assert!(module.is_blocked());
        assert_eq!(module.block_reason.as_deref(), Some("upstream broken"));
        assert_eq!(module.post_install_hooks, vec!["npm_install", "3"]);
        assert_eq!(module.config_cleanup, vec!["eluna_ts.conf*"]);
        assert_eq!(module.sql, Some(json!({ "world": ["a.sql"] })));
        assert_eq!(module.git_ref.as_deref(), Some("v1.2"));
        assert_eq!(module.notes.as_deref(), Some("typescript bindings"));
    }

    #[test]
    fn test_validate_preserves_declaration_order() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_C", "name": "c", "repo": "u" },
                { "key": "MODULE_A", "name": "a", "repo": "u" },
                { "key": "MODULE_B", "name": "b", "repo": "u" }
            ]
        });
        let keys: Vec<String> = validate_manifest(&manifest)
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["MODULE_C", "MODULE_A", "MODULE_B"]);
    }

    #[test]
    fn test_validate_rejects_missing_modules_array() {
        assert_eq!(
            validate_manifest(&json!({})).unwrap_err(),
            vec![ValidationError::MissingModules]
        );
        assert_eq!(
            validate_manifest(&json!({ "modules": {} })).unwrap_err(),
            vec![ValidationError::MissingModules]
        );
    }

    #[test]
    fn test_validate_identifies_keyless_entries_by_index() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_A", "name": "a", "repo": "u" },
                { "name": "b", "repo": "u" },
                { "key": "", "name": "c", "repo": "u" },
                "MODULE_D"
            ]
        });
        assert_eq!(
            validate_manifest(&manifest).unwrap_err(),
            vec![
                ValidationError::MissingKey { index: 1 },
                ValidationError::MissingKey { index: 2 },
                ValidationError::EntryNotObject { index: 3 },
            ]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_X", "name": "x", "repo": "u" },
                { "key": "MODULE_Y", "name": "y", "repo": "u" },
                { "key": "MODULE_X", "name": "x2", "repo": "u" }
            ]
        });
        let errors = validate_manifest(&manifest).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateKey {
                key: "MODULE_X".into(),
                index: 2
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "duplicate manifest key detected: 'MODULE_X' (at index 2)"
        );
    }

    #[test]
    fn test_validate_rejects_missing_name_and_repo() {
        let manifest = json!({
            "modules": [{ "key": "MODULE_A", "name": "", "repo": 7 }]
        });
        assert_eq!(
            validate_manifest(&manifest).unwrap_err(),
            vec![
                ValidationError::MissingField {
                    key: "MODULE_A".into(),
                    field: "name"
                },
                ValidationError::MissingField {
                    key: "MODULE_A".into(),
                    field: "repo"
                },
            ]
        );
    }

    #[test]
    fn test_validate_rejects_wrongly_typed_lists() {
        let manifest = json!({
            "modules": [{
                "key": "MODULE_A",
                "name": "a",
                "repo": "u",
                "requires": "MODULE_B",
                "config_cleanup": [["nested"]]
            }]
        });
        let errors = validate_manifest(&manifest).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::WrongType {
                    key: "MODULE_A".into(),
                    field: "requires",
                    expected: "an array of strings"
                },
                ValidationError::WrongType {
                    key: "MODULE_A".into(),
                    field: "config_cleanup",
                    expected: "an array of strings"
                },
            ]
        );
        assert!(errors[0].to_string().contains("'requires'"));
    }

    #[test]
    fn test_validate_null_lists_are_empty() {
        let manifest = json!({
            "modules": [{ "key": "MODULE_A", "name": "a", "repo": "u", "requires": null }]
        });
        let modules = validate_manifest(&manifest).unwrap();
        assert!(modules[0].requires.is_empty());
    }

    #[test]
    fn test_needs_build_truthiness() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_A", "name": "a", "repo": "u", "needs_build": 0 },
                { "key": "MODULE_B", "name": "b", "repo": "u", "needs_build": "yes", "type": "lua" },
                { "key": "MODULE_C", "name": "c", "repo": "u", "needs_build": null, "type": "lua" }
            ]
        });
        let modules = validate_manifest(&manifest).unwrap();
        assert_eq!(modules[0].needs_build, Some(false));
        assert_eq!(modules[1].needs_build, Some(true));
        assert_eq!(modules[2].needs_build, None);
        assert!(!modules[2].resolved_needs_build());
    }

    #[test]
    fn test_padded_status_and_type_are_taken_literally() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_A", "name": "a", "repo": "u", "status": " blocked " },
                { "key": "MODULE_B", "name": "b", "repo": "u", "type": " cpp" }
            ]
        });
        let modules = validate_manifest(&manifest).unwrap();
        assert!(!modules[0].is_blocked());
        assert_eq!(modules[0].status_text(), " blocked ");
        assert!(!modules[1].resolved_needs_build());

        let toggles = crate::ToggleLayers::new().with_layer(crate::ToggleLayer::file(
            ".env",
            [("MODULE_A", "1"), ("MODULE_B", "1")].into_iter().collect(),
        ));
        let state = crate::resolve_modules(modules, &toggles);
        assert!(!state.modules[0].blocked);
        assert!(state.modules[0].enabled_effective);
        assert!(!state.modules[1].needs_build);
        assert!(state.compile_modules().is_empty());
        assert!(state.warnings.is_empty());
    }

    #[test]
    fn test_declared_text_is_kept_verbatim() {
        let manifest = json!({
            "modules": [
                { "key": "MODULE_A", "name": "a", "repo": "u", "status": "Active", "type": "LUA" },
                { "key": "MODULE_B", "name": "b", "repo": "u" }
            ]
        });
        let modules = validate_manifest(&manifest).unwrap();
        assert_eq!(modules[0].module_type, ModuleType::Lua);
        assert_eq!(modules[0].type_text(), "LUA");
        assert_eq!(modules[0].status_text(), "Active");
        assert_eq!(modules[1].type_text(), "cpp");
        assert_eq!(modules[1].status_text(), "active");
    }

    #[test]
    fn test_validate_rejects_structured_scalar_fields() {
        let manifest = json!({
            "modules": [{ "key": "MODULE_A", "name": "a", "repo": "u", "status": ["blocked"] }]
        });
        assert_eq!(
            validate_manifest(&manifest).unwrap_err(),
            vec![ValidationError::WrongType {
                key: "MODULE_A".into(),
                field: "status",
                expected: "a string"
            }]
        );
    }
}
