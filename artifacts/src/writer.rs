//! Writing generated artifacts to disk.

use std::path::{Path, PathBuf};

use module_manifest_core::ModuleCollectionState;
use tracing::{debug, info};

use crate::error::{ArtifactError, Result};
use crate::render::{render_modules_env, render_name_list, render_sql_manifest, render_state_json};
use crate::sql::discover_enabled_sql;

/// Directory under the output directory holding list files.
pub const META_DIR: &str = ".modules-meta";

/// Locations of the files produced by [`write_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Shell-sourceable toggle exports.
    pub modules_env: PathBuf,
    /// Full JSON snapshot of the resolved state.
    pub state_json: PathBuf,
    /// Compile-set module names, one per line.
    pub compile_list: PathBuf,
    /// Enabled module names, one per line.
    pub enabled_list: PathBuf,
    /// SQL files per enabled module.
    pub sql_manifest: PathBuf,
}

impl ArtifactPaths {
    /// Computes artifact locations for an output directory.
    pub fn new(output_dir: &Path) -> Self {
        let meta = output_dir.join(META_DIR);
        Self {
            modules_env: output_dir.join("modules.env"),
            state_json: output_dir.join("modules-state.json"),
            compile_list: meta.join("modules-compile.txt"),
            enabled_list: meta.join("modules-enabled.txt"),
            sql_manifest: output_dir.join(".sql-manifest.json"),
        }
    }
}

/// Discovers SQL for enabled modules staged under `modules_root`, records it
/// on the state, and writes every artifact into `output_dir`.
///
/// Directories are created as needed and existing files are overwritten.
///
/// # Errors
///
/// Returns [`ArtifactError::Write`] if a directory or file cannot be
/// written, or [`ArtifactError::Json`] if serialization fails.
pub fn write_artifacts(
    state: &mut ModuleCollectionState,
    output_dir: &Path,
    modules_root: &Path,
) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::new(output_dir);
    create_dir(output_dir)?;
    create_dir(&output_dir.join(META_DIR))?;

    let discovered = discover_enabled_sql(state, modules_root);
    debug!(
        modules_root = %modules_root.display(),
        modules = discovered.len(),
        "Discovered module SQL"
    );
    state.attach_sql_files(discovered);

    write_file(&paths.modules_env, &render_modules_env(state))?;
    write_file(&paths.state_json, &render_state_json(state)?)?;
    write_file(&paths.compile_list, &render_name_list(&state.compile_names()))?;
    write_file(&paths.enabled_list, &render_name_list(&state.enabled_names()))?;
    write_file(&paths.sql_manifest, &render_sql_manifest(state)?)?;

    info!(output_dir = %output_dir.display(), "Wrote module artifacts");
    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
    Ok(())
}
