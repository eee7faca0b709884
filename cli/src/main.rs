use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use module_manifest_artifacts::{
    StateLoader, render_dump_json, render_name_list, render_shell_dump, write_artifacts,
};
use module_manifest_core::{Diagnostic, MODULE_KEY_PREFIX, ModuleCollectionState};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Module list selectors for `list --type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListKind {
    /// Names of enabled modules that need a native build.
    Compile,
    /// Names of enabled modules.
    Enabled,
    /// Keys of enabled modules.
    Keys,
}

/// Output formats for `dump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Json,
    Shell,
}

#[derive(Debug, Parser)]
#[command(name = "modules-manifest")]
#[command(about = "Resolve server module toggles against the module manifest")]
#[command(version)]
struct Cli {
    /// Path to the toggle file.
    #[arg(
        long,
        global = true,
        env = "MODULES_ENV_PATH",
        default_value = ".env"
    )]
    env_path: PathBuf,
    /// Path to the module manifest.
    #[arg(
        long,
        global = true,
        env = "MODULES_MANIFEST",
        default_value = "config/module-manifest.json"
    )]
    manifest: PathBuf,
    /// Resolve toggles from the toggle file only, ignoring the process environment.
    #[arg(long, global = true)]
    no_process_env: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate module state files.
    Generate(GenerateArgs),
    /// Print a module list, one item per line.
    List(ListArgs),
    /// Print 1 if the playerbots source tree is required, else 0.
    RequiresPlayerbot,
    /// Print 1 if a custom source build is required, else 0.
    RequiresCustomBuild,
    /// Print the resolved module state without writing files.
    Dump(DumpArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Directory for generated module artifacts.
    #[arg(long, default_value = "local-storage/modules")]
    output_dir: PathBuf,
    /// Directory holding staged module sources (default: the output directory).
    #[arg(long)]
    modules_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// List selector.
    #[arg(long = "type", value_enum, default_value = "compile")]
    kind: ListKind,
}

#[derive(Debug, Args)]
struct DumpArgs {
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: DumpFormat,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Generate(args) => run_generate(&cli, args),
        Command::List(args) => run_list(&cli, args),
        Command::RequiresPlayerbot => run_requires_playerbot(&cli),
        Command::RequiresCustomBuild => run_requires_custom_build(&cli),
        Command::Dump(args) => run_dump(&cli, args),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    std::path::absolute(path)
        .map_err(|err| format!("failed to resolve path '{}': {err}", path.display()))
}

fn load_state(cli: &Cli) -> Result<ModuleCollectionState, String> {
    let manifest = absolute(&cli.manifest)?;
    let env_path = absolute(&cli.env_path)?;
    debug!(
        manifest = %manifest.display(),
        env_path = %env_path.display(),
        process_env = !cli.no_process_env,
        "Loading module state"
    );
    StateLoader::new(manifest, env_path)
        .with_process_env(!cli.no_process_env)
        .load()
        .map_err(|err| err.to_string())
}

/// Exit code for a resolved state: 1 when any error was recorded.
fn exit_code(state: &ModuleCollectionState) -> i32 {
    if state.has_errors() { 1 } else { 0 }
}

fn run_generate(cli: &Cli, args: &GenerateArgs) -> Result<i32, String> {
    let mut state = load_state(cli)?;
    let output_dir = absolute(&args.output_dir)?;
    let modules_dir = match &args.modules_dir {
        Some(dir) => absolute(dir)?,
        None => output_dir.clone(),
    };

    write_artifacts(&mut state, &output_dir, &modules_dir).map_err(|err| err.to_string())?;

    if let Some(report) = warning_report(&state.warnings) {
        eprint!("{report}");
    }
    if let Some(report) = error_report(&state.errors) {
        eprint!("{report}");
    }
    Ok(exit_code(&state))
}

fn run_list(cli: &Cli, args: &ListArgs) -> Result<i32, String> {
    let state = load_state(cli)?;
    print!("{}", render_name_list(&list_items(&state, args.kind)));
    Ok(exit_code(&state))
}

fn run_requires_playerbot(cli: &Cli) -> Result<i32, String> {
    let state = load_state(cli)?;
    println!("{}", flag(state.requires_playerbot_source()));
    Ok(exit_code(&state))
}

fn run_requires_custom_build(cli: &Cli) -> Result<i32, String> {
    let state = load_state(cli)?;
    println!("{}", flag(state.requires_custom_build()));
    Ok(exit_code(&state))
}

fn run_dump(cli: &Cli, args: &DumpArgs) -> Result<i32, String> {
    let state = load_state(cli)?;
    let output = match args.format {
        DumpFormat::Json => render_dump_json(&state).map_err(|err| err.to_string())?,
        DumpFormat::Shell => render_shell_dump(&state),
    };
    print!("{output}");
    Ok(exit_code(&state))
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn list_items(state: &ModuleCollectionState, kind: ListKind) -> Vec<&str> {
    match kind {
        ListKind::Compile => state.compile_names(),
        ListKind::Enabled => state.enabled_names(),
        ListKind::Keys => state.enabled_keys(),
    }
}

/// Distinct module keys named at the start of a warning, sorted.
fn modules_with_warnings(warnings: &[Diagnostic]) -> Vec<String> {
    let mut keys: Vec<String> = warnings
        .iter()
        .map(ToString::to_string)
        .filter(|text| text.starts_with(MODULE_KEY_PREFIX))
        .filter_map(|text| {
            text.split_whitespace()
                .next()
                .map(|token| token.trim_matches(|ch| ch == ':' || ch == ',').to_string())
        })
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn warning_report(warnings: &[Diagnostic]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }

    let mut report = String::from("Module manifest warnings detected:\n");
    let keys = modules_with_warnings(warnings);
    if !keys.is_empty() {
        report.push_str(&format!("  - Modules with warnings: {}\n", keys.join(", ")));
    }
    for warning in warnings {
        report.push_str(&format!("  - {warning}\n"));
    }
    report.push('\n');
    Some(report)
}

fn error_report(errors: &[Diagnostic]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let mut report = String::from("Module manifest errors detected:\n");
    for error in errors {
        report.push_str(&format!("- {error}\n"));
    }
    report.push('\n');
    Some(report)
}
