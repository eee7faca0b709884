//! Core types, validation, and resolution for server module manifests.
//!
//! This crate models the optional modules of a game-server deployment and
//! computes their canonical state:
//!
//! - [`ModuleDeclaration`]: one validated manifest entry.
//! - [`ToggleLayers`]: ordered toggle sources (a `.env` file, the process
//!   environment, ...), parsed with [`parse_toggles`].
//! - [`ModuleState`] / [`ModuleCollectionState`]: the resolved runtime view,
//!   with effective enablement and advisory [`Diagnostic`]s.
//!
//! Validation ([`validate_manifest`]) rejects structurally broken manifests
//! with tagged [`ValidationError`]s. Resolution ([`resolve_modules`]) never
//! fails; dependency and coverage issues are collected as diagnostics.
//!
//! No function in this crate touches the filesystem.
//!
//! # Example
//!
//! ```
//! use module_manifest_core::*;
//! use serde_json::json;
//!
//! let manifest = json!({
//!     "modules": [
//!         { "key": "MODULE_PLAYERBOTS", "name": "mod-playerbots", "repo": "u" },
//!         { "key": "MODULE_ELUNA", "name": "mod-eluna", "repo": "u", "type": "lua" }
//!     ]
//! });
//! let declarations = validate_manifest(&manifest).unwrap();
//!
//! let parsed = parse_toggles("MODULE_PLAYERBOTS=1\nMODULE_ELUNA=1\n");
//! let toggles = ToggleLayers::new().with_layer(ToggleLayer::file(".env", parsed.values));
//!
//! let state = resolve_modules(declarations, &toggles);
//! assert!(state.requires_playerbot_source());
//! assert_eq!(state.compile_names(), vec!["mod-playerbots"]);
//! assert!(!state.has_errors());
//! ```

mod diagnostic;
mod query;
mod resolve;
mod toggles;
mod types;
mod validate;

pub use diagnostic::Diagnostic;
pub use resolve::{resolve_modules, resolve_modules_at};
pub use toggles::{
    ParsedToggles, SkipReason, SkippedLine, TRUTHY_VALUES, ToggleLayer, ToggleLayers, ToggleMap,
    ToggleOrigin, is_truthy, parse_toggles,
};
pub use types::*;
pub use validate::{ValidationError, validate_manifest};
