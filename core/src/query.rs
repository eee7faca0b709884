//! Read-only queries over a resolved [`ModuleCollectionState`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{ModuleCollectionState, ModuleState, PLAYERBOTS_MODULE_KEY, SqlFileMap};

impl ModuleCollectionState {
    /// Records the manifest and toggle file paths the state was built from.
    pub fn with_sources(
        mut self,
        manifest_path: impl Into<PathBuf>,
        env_path: impl Into<PathBuf>,
    ) -> Self {
        self.manifest_path = manifest_path.into();
        self.env_path = env_path.into();
        self
    }

    /// Looks up a module by key.
    pub fn get(&self, key: &str) -> Option<&ModuleState> {
        self.modules.iter().find(|module| module.key() == key)
    }

    /// Effectively enabled modules, in declaration order.
    pub fn enabled_modules(&self) -> Vec<&ModuleState> {
        self.modules
            .iter()
            .filter(|module| module.enabled_effective)
            .collect()
    }

    /// Effectively enabled modules that need a native build.
    pub fn compile_modules(&self) -> Vec<&ModuleState> {
        self.modules
            .iter()
            .filter(|module| module.enabled_effective && module.needs_build)
            .collect()
    }

    /// Returns `true` when the playerbots module is effectively enabled.
    pub fn requires_playerbot_source(&self) -> bool {
        self.get(PLAYERBOTS_MODULE_KEY)
            .is_some_and(|module| module.enabled_effective)
    }

    /// Returns `true` when any effectively enabled module needs a build.
    pub fn requires_custom_build(&self) -> bool {
        self.modules
            .iter()
            .any(|module| module.enabled_effective && module.needs_build)
    }

    /// Returns `true` if resolution recorded any error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Names of enabled modules.
    pub fn enabled_names(&self) -> Vec<&str> {
        self.enabled_modules().into_iter().map(ModuleState::name).collect()
    }

    /// Names of modules in the compile set.
    pub fn compile_names(&self) -> Vec<&str> {
        self.compile_modules().into_iter().map(ModuleState::name).collect()
    }

    /// Keys of enabled modules.
    pub fn enabled_keys(&self) -> Vec<&str> {
        self.enabled_modules().into_iter().map(ModuleState::key).collect()
    }

    /// Keys of modules in the compile set.
    pub fn compile_keys(&self) -> Vec<&str> {
        self.compile_modules().into_iter().map(ModuleState::key).collect()
    }

    /// Stores discovered SQL files on the matching modules.
    ///
    /// Entries for unknown keys are ignored. Files are appended to any
    /// already recorded for the same category.
    pub fn attach_sql_files(&mut self, discovered: BTreeMap<String, SqlFileMap>) {
        for (key, files) in discovered {
            let Some(module) = self.modules.iter_mut().find(|m| m.key() == key) else {
                continue;
            };
            for (category, paths) in files {
                module.sql_files.entry(category).or_default().extend(paths);
            }
        }
    }
}
