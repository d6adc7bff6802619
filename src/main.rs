use anchor_patch::config::{self, to_toml_string, ConfigSource};
use anchor_patch::{
    parse_requests, Engine, EngineConfig, FilePatch, FilePatcher, PatchRequest, RequestFormat,
    WorkspaceGuard, WriteError, WriteMode,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "anchor-patch")]
#[command(about = "Apply context-anchored patches to text files", long_about = None)]
#[command(version)]
struct Cli {
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch requests to files
    Apply {
        /// Request file, or a directory of *.json / *.toml request files
        request: PathBuf,

        /// Workspace root that request paths are resolved against and confined to
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Engine config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that patch requests apply cleanly without modifying files
    Check {
        /// Request file, or a directory of *.json / *.toml request files
        request: PathBuf,

        /// Workspace root that request paths are resolved against and confined to
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Engine config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate and print the effective engine config
    Config {
        /// Engine config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            request,
            workspace,
            config,
            dry_run,
            diff,
            json,
        } => cmd_apply(&request, workspace, config, dry_run, diff, json),

        Commands::Check {
            request,
            workspace,
            config,
        } => cmd_check(&request, workspace, config),

        Commands::Config { config } => cmd_config(config),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ANCHOR_PATCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded; keep the existing one
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve the workspace root.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. ANCHOR_PATCH_WORKSPACE environment variable
/// 3. None: request paths are used as given
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_workspace {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()))?;
        return Ok(Some(canonical));
    }

    if let Ok(env_path) = env::var("ANCHOR_PATCH_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(Some(path.canonicalize()?));
        }
        eprintln!(
            "{}",
            format!(
                "Warning: ANCHOR_PATCH_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(None)
}

/// Load the engine config.
///
/// Priority order:
/// 1. Explicit --config flag
/// 2. `.anchor-patch.toml` in the workspace, or the current directory
/// 3. Built-in defaults
fn resolve_config(
    cli_config: Option<PathBuf>,
    workspace: Option<&Path>,
) -> Result<(EngineConfig, ConfigSource)> {
    let base = match workspace {
        Some(root) => root.to_path_buf(),
        None => env::current_dir()?,
    };
    let (config, source) = config::resolve(cli_config.as_deref(), &base)?;
    tracing::debug!(%source, "engine config");
    Ok((config, source))
}

/// Collect request files: the path itself, or the `*.json` / `*.toml` files
/// directly inside it, sorted.
fn discover_request_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!("Request path not found: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).max_depth(1) {
        let entry = entry?;
        let is_request = matches!(
            entry.path().extension().and_then(|s| s.to_str()),
            Some("json") | Some("toml")
        );
        if entry.file_type().is_file() && is_request {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .json or .toml request files found in {}", path.display());
    }
    Ok(files)
}

fn load_requests(path: &Path) -> Result<Vec<PatchRequest>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    parse_requests(&contents, RequestFormat::from_path(path))
        .with_context(|| format!("invalid request file {}", path.display()))
}

fn build_patcher(
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(FilePatcher, Option<PathBuf>)> {
    let workspace = resolve_workspace(workspace)?;
    let (config, _) = resolve_config(config, workspace.as_deref())?;

    let mut patcher = FilePatcher::new(Engine::new(config));
    if let Some(root) = &workspace {
        patcher = patcher.with_guard(WorkspaceGuard::new(root)?);
    }
    Ok((patcher, workspace))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
        }
    }
}

fn print_warnings(patch: &FilePatch) {
    for warning in &patch.result.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}

fn json_report(target: &str, outcome: &Result<FilePatch, WriteError>) -> serde_json::Value {
    match outcome {
        Ok(patch) => serde_json::json!({
            "target": target,
            "path": patch.path,
            "written": patch.written,
            "result": patch.result,
        }),
        Err(e) => serde_json::json!({
            "target": target,
            "error": e.to_string(),
        }),
    }
}

fn cmd_apply(
    request: &Path,
    workspace: Option<PathBuf>,
    config: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let (patcher, workspace) = build_patcher(workspace, config)?;
    let request_files = discover_request_files(request)?;
    let mode = if dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };

    if !json {
        if let Some(root) = &workspace {
            println!("Workspace: {}", root.display());
        }
        if dry_run {
            println!("{}", "[DRY RUN - no files will be modified]".cyan());
        }
        println!();
    }

    let mut total_applied = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;
    let mut reports = Vec::new();

    for request_file in request_files {
        if !json {
            println!("Loading requests from {}...", request_file.display());
        }

        for request in load_requests(&request_file)? {
            let outcome = patcher.patch(&request, mode);

            match &outcome {
                Ok(patch) if patch.success() => {
                    if patch.result.is_changed() {
                        total_applied += 1;
                    } else {
                        total_unchanged += 1;
                    }
                }
                _ => total_failed += 1,
            }

            if json {
                reports.push(json_report(&request.target_id, &outcome));
                continue;
            }

            match outcome {
                Ok(patch) if patch.success() => {
                    let changes = patch.result.applied_changes.len();
                    if !patch.result.is_changed() {
                        println!(
                            "{} {}: No changes",
                            "⊙".yellow(),
                            patch.path.display()
                        );
                    } else if dry_run {
                        println!(
                            "{} {}: Would apply {} chunk(s) ({:+} lines)",
                            "✓".green(),
                            patch.path.display(),
                            changes,
                            patch.result.total_delta()
                        );
                    } else {
                        println!(
                            "{} {}: Applied {} chunk(s) ({:+} lines)",
                            "✓".green(),
                            patch.path.display(),
                            changes,
                            patch.result.total_delta()
                        );
                    }
                    print_warnings(&patch);

                    if show_diff && patch.result.is_changed() {
                        display_diff(
                            &patch.path,
                            &patch.result.original_content,
                            &patch.result.modified_content,
                        );
                    }
                }
                Ok(patch) => {
                    eprintln!("{} {}: Failed", "✗".red(), patch.path.display());
                    for error in &patch.result.errors {
                        eprintln!("  {}", error.red());
                    }
                    print_warnings(&patch);
                    eprintln!("  File left unchanged.");
                }
                Err(e) => {
                    eprintln!("{} {}: Error - {}", "✗".red(), request.target_id, e);

                    if let WriteError::ConcurrentModification { .. } = &e {
                        eprintln!("  {}", "CONFLICT: file changed while patching".red());
                        eprintln!("  Action: re-run the request against the current content");
                    }
                }
            }
        }

        if !json {
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("{}", "Summary:".bold());
        println!("  {} applied", format!("{}", total_applied).green());
        println!("  {} unchanged", format!("{}", total_unchanged).yellow());
        println!("  {} failed", format!("{}", total_failed).red());
    }

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(request: &Path, workspace: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let (patcher, _) = build_patcher(workspace, config)?;
    let request_files = discover_request_files(request)?;

    println!("{}", "Checking requests...".bold());
    println!();

    let mut passed = 0;
    let mut failed = 0;

    for request_file in request_files {
        for request in load_requests(&request_file)? {
            match patcher.patch(&request, WriteMode::DryRun) {
                Ok(patch) if patch.success() => {
                    println!("{} {}: OK", "✓".green(), request.target_id);
                    passed += 1;
                }
                Ok(patch) => {
                    eprintln!("{} {}: FAILED", "✗".red(), request.target_id);
                    for error in &patch.result.errors {
                        eprintln!("  {}", error);
                    }
                    failed += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: FAILED", "✗".red(), request.target_id);
                    eprintln!("  {}", e);
                    failed += 1;
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} ok", format!("{}", passed).green());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_config(config: Option<PathBuf>) -> Result<()> {
    let (config, source) = resolve_config(config, None)?;
    println!("# source: {}", source);
    print!("{}", to_toml_string(&config)?);
    Ok(())
}
