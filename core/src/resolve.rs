//! Module state resolution.
//!
//! Combines validated declarations with layered toggles into a
//! [`ModuleCollectionState`]. Resolution is a pure function of its inputs
//! apart from the generation timestamp.
//!
//! A dependency error does **not** clear `enabled_effective` on the module
//! that raised it. Downstream consumers may therefore still treat such a
//! module as active; the error only affects the caller's success signal.
//!
//! # Examples
//!
//! ```
//! use module_manifest_core::*;
//!
//! let declarations = vec![
//!     ModuleDeclaration::new("MODULE_A", "mod-a", "u").with_requirement("MODULE_B"),
//!     ModuleDeclaration::new("MODULE_B", "mod-b", "u"),
//! ];
//! let toggles = ToggleLayers::new().with_layer(ToggleLayer::file(
//!     ".env",
//!     [("MODULE_A", "1"), ("MODULE_B", "0")].into_iter().collect(),
//! ));
//!
//! let state = resolve_modules(declarations, &toggles);
//! assert!(state.modules[0].enabled_effective);
//! assert_eq!(state.errors[0].to_string(), "MODULE_A requires module: MODULE_B");
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{
    Diagnostic, MODULE_KEY_PREFIX, ModuleCollectionState, ModuleDeclaration, ModuleState,
    SqlFileMap, ToggleLayers, is_truthy,
};

/// Resolves module state, stamped with the current time.
pub fn resolve_modules(
    declarations: Vec<ModuleDeclaration>,
    toggles: &ToggleLayers,
) -> ModuleCollectionState {
    resolve_modules_at(declarations, toggles, Utc::now())
}

/// Resolves module state with an explicit generation timestamp.
pub fn resolve_modules_at(
    declarations: Vec<ModuleDeclaration>,
    toggles: &ToggleLayers,
    generated_at: DateTime<Utc>,
) -> ModuleCollectionState {
    let mut modules: Vec<ModuleState> = declarations
        .into_iter()
        .map(|declaration| resolve_module(declaration, toggles))
        .collect();

    check_dependencies(&mut modules);

    let mut warnings: Vec<Diagnostic> = Vec::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    for module in &modules {
        warnings.extend(module.warnings.iter().cloned());
        errors.extend(module.errors.iter().cloned());
    }
    warnings.extend(coverage_warnings(&modules, toggles));

    ModuleCollectionState {
        modules,
        generated_at,
        manifest_path: PathBuf::new(),
        env_path: PathBuf::new(),
        warnings,
        errors,
    }
}

fn resolve_module(declaration: ModuleDeclaration, toggles: &ToggleLayers) -> ModuleState {
    let needs_build = declaration.resolved_needs_build();
    let enabled_raw = toggles.lookup(&declaration.key).is_some_and(is_truthy);
    let blocked = declaration.is_blocked();

    let mut warnings = Vec::new();
    if blocked && enabled_raw {
        warnings.push(Diagnostic::Blocked {
            key: declaration.key.clone(),
            reason: declaration.block_reason.clone(),
        });
    }

    ModuleState {
        needs_build,
        enabled_raw,
        blocked,
        enabled_effective: enabled_raw && !blocked,
        dependency_issues: Vec::new(),
        warnings,
        errors: Vec::new(),
        sql_files: SqlFileMap::new(),
        declaration,
    }
}

fn check_dependencies(modules: &mut [ModuleState]) {
    let effective: HashMap<String, bool> = modules
        .iter()
        .map(|module| (module.key().to_string(), module.enabled_effective))
        .collect();

    for module in modules.iter_mut().filter(|m| m.enabled_effective) {
        let missing: Vec<String> = module
            .declaration
            .requires
            .iter()
            .filter(|dep| !effective.get(dep.as_str()).copied().unwrap_or(false))
            .cloned()
            .collect();

        if !missing.is_empty() {
            let key = module.key().to_string();
            module.errors.push(Diagnostic::MissingDependencies {
                key,
                missing: missing.clone(),
            });
            module.dependency_issues = missing;
        }
    }
}

fn coverage_warnings(modules: &[ModuleState], toggles: &ToggleLayers) -> Vec<Diagnostic> {
    let declared: HashSet<&str> = modules.iter().map(ModuleState::key).collect();

    let unknown = toggles
        .file_keys()
        .into_iter()
        .filter(|key| key.starts_with(MODULE_KEY_PREFIX) && !declared.contains(key))
        .map(|key| Diagnostic::UnknownToggle {
            key: key.to_string(),
        });

    let undeclared = modules
        .iter()
        .filter(|module| !toggles.contains(module.key()))
        .map(|module| Diagnostic::UndeclaredToggle {
            key: module.key().to_string(),
        });

    unknown.chain(undeclared).collect()
}
