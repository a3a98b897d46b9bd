use anyhow::{Context, Result};
use brace_patcher::config::{
    apply_patches, discover_patch_files, load_from_path, ApplicationError, PatchConfig,
};
use brace_patcher::session::{OperationOutcome, RunMode, SessionReport, SessionStatus};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const WORKSPACE_ENV: &str = "BRACE_PATCHER_WORKSPACE";

#[derive(Parser)]
#[command(name = "brace-patcher")]
#[command(about = "Structural source patching by brace-depth block replacement", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch files to a workspace
    Apply {
        /// Path to workspace root (defaults to $BRACE_PATCHER_WORKSPACE, then cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific patch file to apply (otherwise applies all in <workspace>/patches)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Emit session reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether patches would apply cleanly, without writing
    Check {
        /// Path to workspace root (defaults to $BRACE_PATCHER_WORKSPACE, then cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific patch file to check
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Emit session reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// List patches and their target files
    List {
        /// Path to workspace root (defaults to $BRACE_PATCHER_WORKSPACE, then cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific patch file to list
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let failed = match cli.command {
        Commands::Apply {
            workspace,
            patches,
            dry_run,
            diff,
            json,
        } => {
            let mode = if dry_run {
                RunMode::DryRun
            } else {
                RunMode::Commit
            };
            cmd_run(workspace, patches, mode, diff, json)?
        }
        Commands::Check {
            workspace,
            patches,
            json,
        } => cmd_run(workspace, patches, RunMode::DryRun, false, json)?,
        Commands::List { workspace, patches } => {
            cmd_list(workspace, patches)?;
            false
        }
    };

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve workspace path.
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. BRACE_PATCHER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var(WORKSPACE_ENV) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: {WORKSPACE_ENV} is set but path doesn't exist: {env_path}").yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Determine patch files: explicit flag, else `<workspace>/patches/*.toml`.
fn resolve_patch_files(workspace: &Path, patches: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    if let Some(path) = patches {
        return Ok(vec![path]);
    }

    let dir = workspace.join("patches");
    let files = discover_patch_files(&dir)?;
    if files.is_empty() {
        anyhow::bail!("No .toml patch files found in {}", dir.display());
    }
    Ok(files)
}

fn load_configs(files: &[PathBuf]) -> Result<Vec<(PathBuf, PatchConfig)>> {
    files
        .iter()
        .map(|file| Ok((file.clone(), load_from_path(file)?)))
        .collect()
}

/// Show unified diff between original and patched content.
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
    }
}

#[derive(Default)]
struct Totals {
    committed: usize,
    would_commit: usize,
    unchanged: usize,
    aborted: usize,
    errors: usize,
    noops: usize,
}

fn print_report(report: &SessionReport, show_diff: bool) {
    let (symbol, label) = match &report.status {
        SessionStatus::Committed => ("✓".green(), "committed".green()),
        SessionStatus::WouldCommit => ("✓".green(), "would commit".green()),
        SessionStatus::Unchanged => ("⊙".yellow(), "unchanged".yellow()),
        SessionStatus::Aborted { .. } => ("✗".red(), "aborted".red()),
    };
    println!("{} {}: {}", symbol, report.file.display(), label);

    for record in &report.operations {
        let marker = match &record.outcome {
            OperationOutcome::Applied => "✓".green(),
            OperationOutcome::Skipped => "⊘".cyan(),
            OperationOutcome::Fatal { .. } => "✗".red(),
            _ => "⊙".yellow(),
        };
        println!("    {} {}: {}", marker, record.id, record.outcome);
    }

    if let SessionStatus::Aborted { reason } = &report.status {
        eprintln!("  {}", "File left untouched.".red());
        eprintln!("  Reason: {}", reason);
    }

    if show_diff && !report.status.is_aborted() && report.changed() {
        display_diff(&report.file, &report.original, &report.document);
    }
}

fn print_error(file: &Path, error: &ApplicationError) {
    eprintln!("{} {}: Error - {}", "✗".red(), file.display(), error);
    if let ApplicationError::Safety { .. } = error {
        eprintln!("  Possible causes:");
        eprintln!("    - File does not exist or was moved");
        eprintln!("    - Path escapes the workspace root");
        eprintln!("    - Patch file needs `workspace_relative = true`");
    }
}

fn cmd_run(
    workspace: Option<PathBuf>,
    patches: Option<PathBuf>,
    mode: RunMode,
    show_diff: bool,
    json: bool,
) -> Result<bool> {
    let workspace = resolve_workspace(workspace)?;
    let patch_files = resolve_patch_files(&workspace, patches)?;
    let configs = load_configs(&patch_files)?;

    let mut totals = Totals::default();
    let mut json_reports = Vec::new();

    if !json {
        println!("Workspace: {}", workspace.display());
        if mode == RunMode::DryRun {
            println!("{}", "[DRY RUN - no files will be written]".cyan());
        }
        println!();
    }

    for (patch_file, config) in &configs {
        if !json {
            println!("Loading patches from {}...", patch_file.display());
        }

        for (file, result) in apply_patches(config, &workspace, mode) {
            match result {
                Ok(report) => {
                    totals.noops += report.count(OperationOutcome::is_noop);
                    match report.status {
                        SessionStatus::Committed => totals.committed += 1,
                        SessionStatus::WouldCommit => totals.would_commit += 1,
                        SessionStatus::Unchanged => totals.unchanged += 1,
                        SessionStatus::Aborted { .. } => totals.aborted += 1,
                    }
                    if json {
                        json_reports.push(serde_json::to_value(&report)?);
                    } else {
                        print_report(&report, show_diff);
                    }
                }
                Err(e) => {
                    totals.errors += 1;
                    if json {
                        json_reports.push(serde_json::json!({
                            "file": file,
                            "status": "error",
                            "error": e.to_string(),
                        }));
                    } else {
                        print_error(&file, &e);
                    }
                }
            }
        }

        if !json {
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    } else {
        println!("{}", "Summary:".bold());
        match mode {
            RunMode::Commit => {
                println!("  {} committed", format!("{}", totals.committed).green())
            }
            RunMode::DryRun => println!(
                "  {} would commit",
                format!("{}", totals.would_commit).green()
            ),
        }
        println!("  {} unchanged", format!("{}", totals.unchanged).yellow());
        println!("  {} no-op operations", format!("{}", totals.noops).yellow());
        println!("  {} aborted", format!("{}", totals.aborted).red());
        println!("  {} errors", format!("{}", totals.errors).red());
    }

    Ok(totals.aborted > 0 || totals.errors > 0)
}

fn cmd_list(workspace: Option<PathBuf>, patches: Option<PathBuf>) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let patch_files = resolve_patch_files(&workspace, patches)?;

    for (patch_file, config) in load_configs(&patch_files)? {
        let name = if config.meta.name.is_empty() {
            patch_file.display().to_string()
        } else {
            config.meta.name.clone()
        };
        println!("{}", name.bold());
        if let Some(description) = &config.meta.description {
            println!("  {}", description.dimmed());
        }

        for (file, group) in config.sessions(&workspace) {
            println!("  {}", file.display());
            for patch in group {
                println!("    - {} ({})", patch.id, patch.operation.kind().cyan());
            }
        }
        println!();
    }

    Ok(())
}
