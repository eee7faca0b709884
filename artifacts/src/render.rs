//! Pure renderers from a resolved state to artifact text.
//!
//! Every function here is a side-effect-free transform of the same
//! [`ModuleCollectionState`]; writing the results is left to
//! [`write_artifacts`](crate::write_artifacts) and the CLI.
//!
//! JSON documents are emitted pretty-printed with sorted object keys and a
//! trailing newline.

use chrono::SecondsFormat;
use module_manifest_core::{Diagnostic, ModuleCollectionState, ModuleState, SqlFileMap};
use serde::Serialize;

use crate::error::Result;

/// Header line identifying generated files.
pub const GENERATED_HEADER: &str = "# Autogenerated by modules-manifest";

/// Associative arrays emitted by [`render_shell_dump`], in output order.
pub const SHELL_ARRAYS: [&str; 13] = [
    "MODULE_NAME",
    "MODULE_REPO",
    "MODULE_REF",
    "MODULE_TYPE",
    "MODULE_ENABLED",
    "MODULE_NEEDS_BUILD",
    "MODULE_BLOCKED",
    "MODULE_POST_INSTALL",
    "MODULE_REQUIRES",
    "MODULE_CONFIG_CLEANUP",
    "MODULE_NOTES",
    "MODULE_STATUS",
    "MODULE_BLOCK_REASON",
];

fn timestamp(state: &ModuleCollectionState) -> String {
    state
        .generated_at
        .to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Renders `modules.env`: one `export KEY=0|1` line per module plus the
/// aggregate variables consumed by build scripts.
///
/// # Examples
///
/// ```
/// use module_manifest_core::*;
/// use module_manifest_artifacts::render_modules_env;
///
/// let toggles = ToggleLayers::new()
///     .with_layer(ToggleLayer::file(".env", [("MODULE_A", "1")].into_iter().collect()));
/// let state = resolve_modules(vec![ModuleDeclaration::new("MODULE_A", "mod-a", "u")], &toggles);
///
/// let text = render_modules_env(&state);
/// assert!(text.contains("export MODULE_A=1\n"));
/// assert!(text.contains("export MODULES_COMPILE=\"mod-a\"\n"));
/// assert!(text.contains("export MODULES_ERROR_COUNT=0\n"));
/// ```
pub fn render_modules_env(state: &ModuleCollectionState) -> String {
    let mut lines: Vec<String> = vec![
        GENERATED_HEADER.to_string(),
        format!("# Generated at {}", timestamp(state)),
        format!(
            "export MODULES_MANIFEST={}",
            double_quote(&state.manifest_path.display().to_string())
        ),
        format!(
            "export MODULES_ENV_PATH={}",
            double_quote(&state.env_path.display().to_string())
        ),
    ];

    for module in &state.modules {
        lines.push(format!("export {}={}", module.key(), module.value()));
    }

    lines.push(format!(
        "export MODULES_ENABLED={}",
        double_quote(&state.enabled_names().join(" "))
    ));
    lines.push(format!(
        "export MODULES_COMPILE={}",
        double_quote(&state.compile_names().join(" "))
    ));
    lines.push(format!(
        "export MODULES_ENABLED_LIST={}",
        double_quote(&state.enabled_keys().join(","))
    ));
    lines.push(format!(
        "export MODULES_CPP_LIST={}",
        double_quote(&state.compile_keys().join(","))
    ));
    lines.push(format!(
        "export MODULES_REQUIRES_PLAYERBOT_SOURCE={}",
        flag(state.requires_playerbot_source())
    ));
    lines.push(format!(
        "export MODULES_REQUIRES_CUSTOM_BUILD={}",
        flag(state.requires_custom_build())
    ));
    lines.push(format!("export MODULES_WARNING_COUNT={}", state.warnings.len()));
    lines.push(format!("export MODULES_ERROR_COUNT={}", state.errors.len()));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Serialize)]
struct ModuleRecord<'a> {
    key: &'a str,
    name: &'a str,
    repo: &'a str,
    needs_build: bool,
    module_type: &'a str,
    requires: &'a [String],
    #[serde(rename = "ref")]
    git_ref: Option<&'a str>,
    status: &'a str,
    block_reason: Option<&'a str>,
    post_install_hooks: &'a [String],
    config_cleanup: &'a [String],
    sql: Option<&'a serde_json::Value>,
    notes: Option<&'a str>,
    enabled_raw: bool,
    enabled_effective: bool,
    blocked: bool,
    value: &'static str,
    dependency_issues: &'a [String],
    warnings: &'a [Diagnostic],
    errors: &'a [Diagnostic],
    sql_files: &'a SqlFileMap,
}

impl<'a> From<&'a ModuleState> for ModuleRecord<'a> {
    fn from(module: &'a ModuleState) -> Self {
        let decl = &module.declaration;
        Self {
            key: &decl.key,
            name: &decl.name,
            repo: &decl.repo,
            needs_build: module.needs_build,
            module_type: decl.type_text(),
            requires: &decl.requires,
            git_ref: decl.git_ref.as_deref(),
            status: decl.status_text(),
            block_reason: decl.block_reason.as_deref(),
            post_install_hooks: &decl.post_install_hooks,
            config_cleanup: &decl.config_cleanup,
            sql: decl.sql.as_ref(),
            notes: decl.notes.as_deref(),
            enabled_raw: module.enabled_raw,
            enabled_effective: module.enabled_effective,
            blocked: module.blocked,
            value: module.value(),
            dependency_issues: &module.dependency_issues,
            warnings: &module.warnings,
            errors: &module.errors,
            sql_files: &module.sql_files,
        }
    }
}

#[derive(Serialize)]
struct StateSnapshot<'a> {
    generated_at: String,
    manifest_path: String,
    env_path: String,
    warnings: &'a [Diagnostic],
    errors: &'a [Diagnostic],
    modules: Vec<ModuleRecord<'a>>,
    enabled_modules: Vec<&'a str>,
    compile_modules: Vec<&'a str>,
    requires_playerbot_source: bool,
    requires_custom_build: bool,
}

/// Renders `modules-state.json`: the full per-module record set plus the
/// aggregate lists and flags.
///
/// # Errors
///
/// Returns [`ArtifactError::Json`](crate::ArtifactError::Json) if
/// serialization fails.
pub fn render_state_json(state: &ModuleCollectionState) -> Result<String> {
    let snapshot = StateSnapshot {
        generated_at: timestamp(state),
        manifest_path: state.manifest_path.display().to_string(),
        env_path: state.env_path.display().to_string(),
        warnings: &state.warnings,
        errors: &state.errors,
        modules: state.modules.iter().map(ModuleRecord::from).collect(),
        enabled_modules: state.enabled_names(),
        compile_modules: state.compile_names(),
        requires_playerbot_source: state.requires_playerbot_source(),
        requires_custom_build: state.requires_custom_build(),
    };
    sorted_json(&snapshot)
}

#[derive(Serialize)]
struct DumpModule<'a> {
    key: &'a str,
    name: &'a str,
    enabled: bool,
    needs_build: bool,
    requires: &'a [String],
    blocked: bool,
    dependency_issues: &'a [String],
    post_install_hooks: &'a [String],
    config_cleanup: &'a [String],
}

#[derive(Serialize)]
struct Dump<'a> {
    generated_at: String,
    warnings: &'a [Diagnostic],
    errors: &'a [Diagnostic],
    modules: Vec<DumpModule<'a>>,
    enabled_modules: Vec<&'a str>,
    compile_modules: Vec<&'a str>,
    requires_playerbot_source: bool,
    requires_custom_build: bool,
}

/// Renders the `dump --format json` document.
///
/// # Errors
///
/// Returns [`ArtifactError::Json`](crate::ArtifactError::Json) if
/// serialization fails.
pub fn render_dump_json(state: &ModuleCollectionState) -> Result<String> {
    let dump = Dump {
        generated_at: timestamp(state),
        warnings: &state.warnings,
        errors: &state.errors,
        modules: state
            .modules
            .iter()
            .map(|module| DumpModule {
                key: module.key(),
                name: module.name(),
                enabled: module.enabled_effective,
                needs_build: module.needs_build,
                requires: &module.declaration.requires,
                blocked: module.blocked,
                dependency_issues: &module.dependency_issues,
                post_install_hooks: &module.declaration.post_install_hooks,
                config_cleanup: &module.declaration.config_cleanup,
            })
            .collect(),
        enabled_modules: state.enabled_names(),
        compile_modules: state.compile_names(),
        requires_playerbot_source: state.requires_playerbot_source(),
        requires_custom_build: state.requires_custom_build(),
    };
    sorted_json(&dump)
}

/// Renders the `dump --format shell` document: bash associative arrays
/// keyed by module key, ready to `eval`.
pub fn render_shell_dump(state: &ModuleCollectionState) -> String {
    let keys: Vec<String> = state
        .modules
        .iter()
        .map(|module| shell_quote(module.key()))
        .collect();

    let mut out = String::new();
    out.push_str(&format!("MODULE_KEYS=({})\n", keys.join(" ")));
    out.push_str(&format!("declare -A {}\n", SHELL_ARRAYS.join(" ")));

    for module in &state.modules {
        let decl = &module.declaration;
        let values: [String; 13] = [
            shell_quote(&decl.name),
            shell_quote(&decl.repo),
            shell_quote(decl.git_ref.as_deref().unwrap_or_default()),
            shell_quote(decl.type_text()),
            flag(module.enabled_effective).to_string(),
            flag(module.needs_build).to_string(),
            flag(module.blocked).to_string(),
            shell_quote(&decl.post_install_hooks.join(",")),
            shell_quote(&decl.requires.join(",")),
            shell_quote(&decl.config_cleanup.join(",")),
            shell_quote(decl.notes.as_deref().unwrap_or_default()),
            shell_quote(decl.status_text()),
            shell_quote(decl.block_reason.as_deref().unwrap_or_default()),
        ];
        for (array, value) in SHELL_ARRAYS.iter().zip(values) {
            out.push_str(&format!("{array}[{}]={value}\n", module.key()));
        }
    }

    out
}

/// Renders a newline-delimited list, with a trailing newline only when the
/// list is non-empty.
///
/// # Examples
///
/// ```
/// use module_manifest_artifacts::render_name_list;
///
/// assert_eq!(render_name_list(&["mod-a", "mod-b"]), "mod-a\nmod-b\n");
/// assert_eq!(render_name_list(&[]), "");
/// ```
pub fn render_name_list(names: &[&str]) -> String {
    let mut out = names.join("\n");
    if !names.is_empty() {
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct SqlManifestEntry<'a> {
    name: &'a str,
    key: &'a str,
    sql_files: &'a SqlFileMap,
}

#[derive(Serialize)]
struct SqlManifest<'a> {
    modules: Vec<SqlManifestEntry<'a>>,
}

/// Renders `.sql-manifest.json`: enabled modules that have discovered SQL
/// files, with their files per database category.
///
/// # Errors
///
/// Returns [`ArtifactError::Json`](crate::ArtifactError::Json) if
/// serialization fails.
pub fn render_sql_manifest(state: &ModuleCollectionState) -> Result<String> {
    let manifest = SqlManifest {
        modules: state
            .enabled_modules()
            .into_iter()
            .filter(|module| module.sql_files.values().any(|files| !files.is_empty()))
            .map(|module| SqlManifestEntry {
                name: module.name(),
                key: module.key(),
                sql_files: &module.sql_files,
            })
            .collect(),
    };
    sorted_json(&manifest)
}

fn sorted_json<T: Serialize>(value: &T) -> Result<String> {
    // Round-tripping through `Value` orders object keys alphabetically.
    let value = serde_json::to_value(value)?;
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    Ok(out)
}

/// Quotes a value for POSIX shells, leaving safe words untouched.
///
/// # Examples
///
/// ```
/// use module_manifest_artifacts::shell_quote;
///
/// assert_eq!(shell_quote("mod-eluna"), "mod-eluna");
/// assert_eq!(shell_quote(""), "''");
/// assert_eq!(shell_quote("it's here"), "'it'\"'\"'s here'");
/// ```
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let safe = value.chars().all(|ch| {
        ch.is_ascii_alphanumeric()
            || matches!(ch, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '_' | '-')
    });
    if safe {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use module_manifest_core::{
        ModuleDeclaration, ModuleStatus, ModuleType, PLAYERBOTS_MODULE_KEY, ToggleLayer,
        ToggleLayers, resolve_modules_at,
    };
    use serde_json::Value;

    use super::*;

    fn sample_state() -> ModuleCollectionState {
        let declarations = vec![
            ModuleDeclaration::new(
                PLAYERBOTS_MODULE_KEY,
                "mod-playerbots",
                "https://example.invalid/pb",
            ),
            ModuleDeclaration::new("MODULE_ELUNA", "mod-eluna", "u")
                .with_type(ModuleType::Lua)
                .with_requirement("MODULE_MISSING"),
            ModuleDeclaration::new("MODULE_OFF", "mod-off", "u"),
            ModuleDeclaration::new("MODULE_BLOCKED", "mod-blocked", "u")
                .with_status(ModuleStatus::Blocked)
                .with_block_reason("it's broken"),
        ];
        let toggles = ToggleLayers::new().with_layer(ToggleLayer::file(
            ".env",
            [
                (PLAYERBOTS_MODULE_KEY, "1"),
                ("MODULE_ELUNA", "1"),
                ("MODULE_OFF", "0"),
                ("MODULE_BLOCKED", "1"),
            ]
            .into_iter()
            .collect(),
        ));
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        resolve_modules_at(declarations, &toggles, generated_at)
            .with_sources("/srv/config/module-manifest.json", "/srv/.env")
    }

    #[test]
    fn test_modules_env_contents() {
        let text = render_modules_env(&sample_state());
        let expected = "\
# Autogenerated by modules-manifest
# Generated at 2024-05-01T12:00:00.000000+00:00
export MODULES_MANIFEST=\"/srv/config/module-manifest.json\"
export MODULES_ENV_PATH=\"/srv/.env\"
export MODULE_PLAYERBOTS=1
export MODULE_ELUNA=1
export MODULE_OFF=0
export MODULE_BLOCKED=0
export MODULES_ENABLED=\"mod-playerbots mod-eluna\"
export MODULES_COMPILE=\"mod-playerbots\"
export MODULES_ENABLED_LIST=\"MODULE_PLAYERBOTS,MODULE_ELUNA\"
export MODULES_CPP_LIST=\"MODULE_PLAYERBOTS\"
export MODULES_REQUIRES_PLAYERBOT_SOURCE=1
export MODULES_REQUIRES_CUSTOM_BUILD=1
export MODULES_WARNING_COUNT=1
export MODULES_ERROR_COUNT=1
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_state_json_has_full_records() {
        let text = render_state_json(&sample_state()).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["generated_at"], "2024-05-01T12:00:00.000000+00:00");
        assert_eq!(json["enabled_modules"], serde_json::json!(["mod-playerbots", "mod-eluna"]));
        assert_eq!(json["compile_modules"], serde_json::json!(["mod-playerbots"]));
        assert_eq!(json["requires_playerbot_source"], true);
        assert_eq!(json["requires_custom_build"], true);
        assert_eq!(json["errors"][0], "MODULE_ELUNA requires module: MODULE_MISSING");

        let eluna = &json["modules"][1];
        assert_eq!(eluna["module_type"], "lua");
        assert_eq!(eluna["needs_build"], false);
        assert_eq!(eluna["enabled_raw"], true);
        assert_eq!(eluna["enabled_effective"], true);
        assert_eq!(eluna["value"], "1");
        assert_eq!(eluna["dependency_issues"], serde_json::json!(["MODULE_MISSING"]));
        assert_eq!(eluna["ref"], Value::Null);

        let blocked = &json["modules"][3];
        assert_eq!(blocked["blocked"], true);
        assert_eq!(blocked["enabled_effective"], false);
        assert_eq!(blocked["status"], "blocked");
        assert_eq!(blocked["warnings"][0], "MODULE_BLOCKED is blocked: it's broken");
    }

    #[test]
    fn test_json_keys_are_sorted() {
        let text = render_state_json(&sample_state()).unwrap();
        let compile = text.find("\"compile_modules\"").unwrap();
        let enabled = text.find("\"enabled_modules\"").unwrap();
        let warnings = text.rfind("\"warnings\"").unwrap();
        assert!(compile < enabled && enabled < warnings);
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_dump_json_shape() {
        let text = render_dump_json(&sample_state()).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        let first = &json["modules"][0];
        assert_eq!(first["key"], "MODULE_PLAYERBOTS");
        assert_eq!(first["enabled"], true);
        assert!(first.get("repo").is_none());
        assert_eq!(json["requires_playerbot_source"], true);
    }

    #[test]
    fn test_shell_dump_quotes_values() {
        let text = render_shell_dump(&sample_state());
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("MODULE_KEYS=(MODULE_PLAYERBOTS MODULE_ELUNA MODULE_OFF MODULE_BLOCKED)")
        );
        assert!(lines.next().unwrap().starts_with("declare -A MODULE_NAME "));
        assert!(text.contains("MODULE_NAME[MODULE_ELUNA]=mod-eluna\n"));
        assert!(text.contains("MODULE_TYPE[MODULE_ELUNA]=lua\n"));
        assert!(text.contains("MODULE_REQUIRES[MODULE_ELUNA]=MODULE_MISSING\n"));
        assert!(text.contains("MODULE_REF[MODULE_ELUNA]=''\n"));
        assert!(text.contains("MODULE_ENABLED[MODULE_BLOCKED]=0\n"));
        assert!(text.contains("MODULE_BLOCKED[MODULE_BLOCKED]=1\n"));
        assert!(text.contains("MODULE_BLOCK_REASON[MODULE_BLOCKED]='it'\"'\"'s broken'\n"));
        assert_eq!(text.lines().count(), 2 + 4 * SHELL_ARRAYS.len());
    }

    #[test]
    fn test_sql_manifest_only_lists_enabled_modules_with_files() {
        let mut state = sample_state();
        let mut files = SqlFileMap::new();
        files.insert("db_world".into(), vec!["data/sql/db-world/a.sql".into()]);
        let mut discovered = std::collections::BTreeMap::new();
        discovered.insert("MODULE_ELUNA".to_string(), files.clone());
        discovered.insert("MODULE_OFF".to_string(), files);
        state.attach_sql_files(discovered);

        let json: Value = serde_json::from_str(&render_sql_manifest(&state).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "modules": [{
                    "name": "mod-eluna",
                    "key": "MODULE_ELUNA",
                    "sql_files": { "db_world": ["data/sql/db-world/a.sql"] }
                }]
            })
        );
    }

    #[test]
    fn test_manifest_spelling_is_echoed() {
        let manifest = serde_json::json!({
            "modules": [{
                "key": "MODULE_A",
                "name": "mod-a",
                "repo": "u",
                "status": "Active",
                "type": "LUA"
            }]
        });
        let declarations = module_manifest_core::validate_manifest(&manifest).unwrap();
        let toggles = ToggleLayers::new().with_layer(ToggleLayer::file(
            ".env",
            [("MODULE_A", "1")].into_iter().collect(),
        ));
        let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let state = resolve_modules_at(declarations, &toggles, generated_at);

        let json: Value = serde_json::from_str(&render_state_json(&state).unwrap()).unwrap();
        assert_eq!(json["modules"][0]["module_type"], "LUA");
        assert_eq!(json["modules"][0]["status"], "Active");

        let shell = render_shell_dump(&state);
        assert!(shell.contains("MODULE_TYPE[MODULE_A]=LUA\n"));
        assert!(shell.contains("MODULE_STATUS[MODULE_A]=Active\n"));
        assert!(shell.contains("MODULE_NEEDS_BUILD[MODULE_A]=0\n"));
    }

    #[test]
    fn test_double_quote_escapes_shell_specials() {
        assert_eq!(double_quote("a \"b\" $c"), "\"a \\\"b\\\" \\$c\"");
    }
}
