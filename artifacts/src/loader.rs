//! Input loading with an explicit toggle fallback chain.
//!
//! [`StateLoader`] reads the manifest and the toggle file, assembles the
//! ordered [`ToggleLayers`], and resolves a [`ModuleCollectionState`].
//!
//! # Loading patterns
//!
//! ```no_run
//! use module_manifest_artifacts::StateLoader;
//!
//! // Toggle file first, then the process environment
//! let state = StateLoader::new("config/module-manifest.json", ".env")
//!     .load()
//!     .unwrap();
//!
//! // Toggle file only
//! let state = StateLoader::new("config/module-manifest.json", ".env")
//!     .with_process_env(false)
//!     .load()
//!     .unwrap();
//! println!("{} module(s) enabled", state.enabled_modules().len());
//! ```

use std::path::{Path, PathBuf};

use module_manifest_core::{
    ModuleCollectionState, ModuleDeclaration, SkipReason, ToggleLayer, ToggleLayers, ToggleMap,
    parse_toggles, resolve_modules, validate_manifest,
};
use tracing::{debug, info, warn};

use crate::error::{ArtifactError, Result};

/// Loads and validates a manifest file.
///
/// # Errors
///
/// Returns [`ArtifactError::ManifestNotFound`] if the file does not exist,
/// [`ArtifactError::InvalidJson`] if it is not JSON,
/// [`ArtifactError::InvalidManifest`] if validation fails, or
/// [`ArtifactError::Io`] if it cannot be read.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Vec<ModuleDeclaration>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ArtifactError::ManifestNotFound(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path)?;
    let document: serde_json::Value =
        serde_json::from_str(&raw).map_err(|err| ArtifactError::InvalidJson {
            path: path.to_path_buf(),
            line: err.line(),
            column: err.column(),
            message: syntax_message(&err),
        })?;

    let declarations = validate_manifest(&document).map_err(ArtifactError::InvalidManifest)?;
    debug!(path = %path.display(), modules = declarations.len(), "Loaded manifest");
    Ok(declarations)
}

/// Parser message without serde_json's trailing "at line N column M".
fn syntax_message(err: &serde_json::Error) -> String {
    let mut text = err.to_string();
    let position = format!(" at line {} column {}", err.line(), err.column());
    if let Some(len) = text.strip_suffix(position.as_str()).map(str::len) {
        text.truncate(len);
    }
    text
}

/// Loads a `.env`-style toggle file.
///
/// A missing file yields an empty map. An unreadable file is logged and also
/// yields an empty map; toggle loading never fails.
pub fn load_toggle_file(path: impl AsRef<Path>) -> ToggleMap {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "Toggle file not found, using no toggles");
        return ToggleMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to read toggle file");
            return ToggleMap::new();
        }
    };

    let parsed = parse_toggles(&content);
    for skipped in &parsed.skipped {
        match skipped.reason {
            SkipReason::MissingSeparator => {
                debug!(
                    path = %path.display(),
                    line = skipped.line,
                    "Skipping toggle line without '='"
                );
            }
            SkipReason::EmptyKey => {
                warn!(
                    path = %path.display(),
                    line = skipped.line,
                    content = %skipped.content,
                    "Skipping toggle line with empty key"
                );
            }
        }
    }
    parsed.values
}

/// Builds a [`ModuleCollectionState`] from a manifest and toggle sources.
///
/// The toggle file always takes precedence; the process environment is
/// consulted as a fallback unless disabled.
#[derive(Debug, Clone)]
pub struct StateLoader {
    manifest_path: PathBuf,
    env_path: PathBuf,
    process_env: bool,
}

impl StateLoader {
    /// Creates a loader for the given manifest and toggle file.
    pub fn new(manifest_path: impl Into<PathBuf>, env_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            env_path: env_path.into(),
            process_env: true,
        }
    }

    /// Enables or disables the process-environment fallback layer.
    pub fn with_process_env(mut self, enabled: bool) -> Self {
        self.process_env = enabled;
        self
    }

    /// Manifest path.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Toggle file path.
    pub fn env_path(&self) -> &Path {
        &self.env_path
    }

    /// Reads the toggle sources in precedence order.
    pub fn toggle_layers(&self) -> ToggleLayers {
        let mut layers = ToggleLayers::new().with_layer(ToggleLayer::file(
            &self.env_path,
            load_toggle_file(&self.env_path),
        ));
        if self.process_env {
            // Non-UTF-8 variables cannot be module toggles.
            let vars = std::env::vars_os().filter_map(|(key, value)| {
                Some((key.into_string().ok()?, value.into_string().ok()?))
            });
            layers.push(ToggleLayer::process(vars));
        }
        layers
    }

    /// Loads the manifest, reads toggles, and resolves module state.
    ///
    /// The manifest is validated before any toggle is read, so a structural
    /// failure produces no state at all.
    ///
    /// # Errors
    ///
    /// Propagates the fatal errors of [`load_manifest`].
    pub fn load(&self) -> Result<ModuleCollectionState> {
        let declarations = load_manifest(&self.manifest_path)?;
        let toggles = self.toggle_layers();
        let state = resolve_modules(declarations, &toggles)
            .with_sources(&self.manifest_path, &self.env_path);

        for warning in &state.warnings {
            warn!(key = warning.key(), "{warning}");
        }
        for error in &state.errors {
            warn!(key = error.key(), "{error}");
        }
        info!(
            modules = state.modules.len(),
            enabled = state.enabled_modules().len(),
            compile = state.compile_modules().len(),
            warnings = state.warnings.len(),
            errors = state.errors.len(),
            "Resolved module state"
        );

        Ok(state)
    }
}
