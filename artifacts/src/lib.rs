//! Manifest loading, SQL discovery, and artifact generation for server
//! module state.
//!
//! This crate is the filesystem side of `module-manifest-core`: it reads the
//! manifest and toggle sources, scans staged module sources for SQL, and
//! renders the derived views consumed by build and deploy scripts.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use module_manifest_artifacts::{StateLoader, write_artifacts};
//!
//! let mut state = StateLoader::new("config/module-manifest.json", ".env")
//!     .load()
//!     .unwrap();
//!
//! let out = Path::new("local-storage/modules");
//! let paths = write_artifacts(&mut state, out, out).unwrap();
//! println!("wrote {}", paths.modules_env.display());
//! ```
//!
//! # Generated files
//!
//! | File | Contents |
//! |------|----------|
//! | `modules.env` | `export KEY=0/1` per module plus aggregate lists |
//! | `modules-state.json` | full resolved state |
//! | `.modules-meta/modules-compile.txt` | compile-set names |
//! | `.modules-meta/modules-enabled.txt` | enabled names |
//! | `.sql-manifest.json` | SQL files per enabled module |

mod error;
mod loader;
mod render;
mod sql;
mod writer;

pub use error::{ArtifactError, Result};
pub use loader::{StateLoader, load_manifest, load_toggle_file};
pub use render::{
    GENERATED_HEADER, SHELL_ARRAYS, render_dump_json, render_modules_env, render_name_list,
    render_shell_dump, render_sql_manifest, render_state_json, shell_quote,
};
pub use sql::{SQL_LAYOUTS, discover_enabled_sql, discover_sql_files};
pub use writer::{ArtifactPaths, META_DIR, write_artifacts};
