//! Discovery of database migration files inside staged module sources.
//!
//! Modules ship SQL under several layouts. For each canonical category
//! (`db_auth`, `db_world`, `db_characters`, `db_playerbots`) both the
//! underscore and hyphen spellings are scanned in:
//!
//! ```text
//! data/sql/base/<variant>/*.sql
//! data/sql/updates/<variant>/*.sql
//! data/sql/custom/<variant>/*.sql
//! data/sql/<variant>/*.sql          (legacy flat layout)
//! ```
//!
//! Missing directories are skipped silently.

use std::collections::BTreeMap;
use std::path::Path;

use module_manifest_core::{ModuleCollectionState, SQL_CATEGORIES, SqlFileMap};
use tracing::{debug, warn};

/// Sub-directories of `data/sql` scanned before the legacy flat layout.
pub const SQL_LAYOUTS: [&str; 3] = ["base", "updates", "custom"];

/// Returns the underscore and hyphen spellings of a category.
fn category_variants(category: &str) -> [String; 2] {
    [category.to_string(), category.replace('_', "-")]
}

/// Scans one module directory for SQL files.
///
/// Returned paths are relative to `module_root`, use `/` separators, and are
/// grouped under the canonical category regardless of spelling. Within a
/// directory files are ordered by name.
///
/// # Examples
///
/// ```
/// use module_manifest_artifacts::discover_sql_files;
///
/// let root = tempfile::tempdir().unwrap();
/// let dir = root.path().join("data/sql/updates/db-world");
/// std::fs::create_dir_all(&dir).unwrap();
/// std::fs::write(dir.join("001_spawns.sql"), "-- sql").unwrap();
///
/// let files = discover_sql_files(root.path());
/// assert_eq!(files["db_world"], vec!["data/sql/updates/db-world/001_spawns.sql"]);
/// ```
pub fn discover_sql_files(module_root: &Path) -> SqlFileMap {
    let mut found = SqlFileMap::new();
    let sql_root = module_root.join("data").join("sql");
    if !sql_root.is_dir() {
        return found;
    }

    for category in SQL_CATEGORIES {
        let variants = category_variants(category);
        let mut relative_dirs: Vec<String> = Vec::new();
        for layout in SQL_LAYOUTS {
            for variant in &variants {
                relative_dirs.push(format!("data/sql/{layout}/{variant}"));
            }
        }
        for variant in &variants {
            relative_dirs.push(format!("data/sql/{variant}"));
        }

        for relative_dir in relative_dirs {
            let files = sql_files_in(module_root, &relative_dir);
            if !files.is_empty() {
                found
                    .entry(category.to_string())
                    .or_default()
                    .extend(files);
            }
        }
    }

    found
}

fn sql_files_in(module_root: &Path, relative_dir: &str) -> Vec<String> {
    let dir = module_root.join(relative_dir);
    if !dir.is_dir() {
        return Vec::new();
    }

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "Failed to scan SQL directory");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            let is_sql = path.extension().and_then(|ext| ext.to_str()) == Some("sql");
            is_sql.then(|| entry.file_name().to_string_lossy().into_owned())
        })
        .collect();
    names.sort();

    debug!(dir = %dir.display(), files = names.len(), "Scanned SQL directory");
    names
        .into_iter()
        .map(|name| format!("{relative_dir}/{name}"))
        .collect()
}

/// Scans every effectively enabled module staged under `modules_root`.
///
/// A module is staged when `<modules_root>/<module name>` is a directory.
/// The result is keyed by module key and only contains modules with at
/// least one SQL file.
pub fn discover_enabled_sql(
    state: &ModuleCollectionState,
    modules_root: &Path,
) -> BTreeMap<String, SqlFileMap> {
    let mut discovered = BTreeMap::new();
    for module in state.enabled_modules() {
        let module_root = modules_root.join(module.name());
        if !module_root.is_dir() {
            debug!(key = module.key(), path = %module_root.display(), "Module sources not staged");
            continue;
        }
        let files = discover_sql_files(&module_root);
        if !files.is_empty() {
            discovered.insert(module.key().to_string(), files);
        }
    }
    discovered
}
