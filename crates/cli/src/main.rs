//! monosync command-line tool.
//!
//! Provides subcommands for syncing commits between a private and a public
//! monorepo, previewing pending work, inspecting sync status, and editing
//! the project/file mappings in the configuration file.

mod reporter;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use monosync_core::config::{FileMapping, ProjectMapping, SyncConfig};
use monosync_core::errors::ConfigError;
use monosync_core::git::remote_url::redact_url;
use monosync_core::models::{SyncDirection, SyncResult};
use monosync_core::sync_engine::RepoSyncer;

use reporter::SpinnerReporter;

/// Pending commits listed by `preview` before the list is truncated.
const PREVIEW_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// monosync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "monosync",
    version,
    about = "Commit-level sync between a private and a public git monorepo"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "monosync.toml")]
    config: PathBuf,

    /// Access token for the public remote (injected into HTTPS URLs).
    #[arg(long, global = true, env = "MONOSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file.
    Init {
        /// Path of the private monorepo checkout.
        #[arg(long)]
        private_repo: Option<PathBuf>,

        /// Remote URL of the public monorepo.
        #[arg(long)]
        public_url: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Replicate pending commits from one repository to the other.
    Sync {
        /// private-to-public or public-to-private.
        #[arg(short, long, default_value = "private-to-public")]
        direction: SyncDirection,

        /// Report what would be replicated without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Copy the current source tree in a single commit.
        #[arg(long)]
        full: bool,

        /// Push the destination branch after replicating.
        #[arg(long)]
        auto_push: bool,

        /// Delete and re-clone the public repository first.
        #[arg(long)]
        force_reclone: bool,
    },

    /// Show the commits a sync would replicate.
    Preview {
        #[arg(short, long, default_value = "private-to-public")]
        direction: SyncDirection,
    },

    /// Show last synced commit and pending work for both directions.
    Status,

    /// Add a directory mapping.
    AddProject {
        /// Directory in the private repository.
        private_path: String,

        /// Directory in the public repository (defaults to the private path).
        #[arg(long)]
        public_path: Option<String>,

        /// Exclude pattern (repeatable).
        #[arg(short, long = "exclude")]
        excludes: Vec<String>,

        /// Include pattern (repeatable); when given, only matches are synced.
        #[arg(short, long = "include")]
        includes: Vec<String>,
    },

    /// Remove a directory mapping.
    RemoveProject { private_path: String },

    /// Add a single-file mapping.
    AddFile {
        /// File in the private repository.
        private_path: String,

        /// File in the public repository (defaults to the private path).
        #[arg(long)]
        public_path: Option<String>,
    },

    /// Remove a single-file mapping.
    RemoveFile { private_path: String },

    /// List configured projects and files.
    List,

    /// Explain how sync state is kept and how to start over.
    ResetState,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            private_repo,
            public_url,
            force,
        } => cmd_init(&cli.config, private_repo, public_url, force),
        Commands::ResetState => cmd_reset_state(),
        Commands::Sync {
            direction,
            dry_run,
            full,
            auto_push,
            force_reclone,
        } => {
            let mut config = load_config(&cli.config)?;
            if auto_push {
                config.auto_push = true;
            }
            let syncer = RepoSyncer::new(config)
                .with_token(cli.token)
                .with_force_reclone(force_reclone);
            cmd_sync(&syncer, direction, dry_run, full, cli.json)
        }
        Commands::Preview { direction } => {
            let syncer = RepoSyncer::new(load_config(&cli.config)?).with_token(cli.token);
            cmd_preview(&syncer, direction, cli.json)
        }
        Commands::Status => {
            let syncer = RepoSyncer::new(load_config(&cli.config)?).with_token(cli.token);
            cmd_status(&syncer, &cli.config, cli.json)
        }
        Commands::AddProject {
            private_path,
            public_path,
            excludes,
            includes,
        } => {
            let mut project = ProjectMapping::new(private_path);
            project.public_path = public_path;
            project.exclude_patterns = excludes;
            project.include_patterns = includes;
            let label = project.private_path.clone();
            edit_config(&cli.config, |config| config.add_project(project))?;
            println!("{}", style::success(&format!("Added project: {label}")));
            Ok(())
        }
        Commands::RemoveProject { private_path } => {
            edit_config(&cli.config, |config| {
                config.remove_project(&private_path).map(|_| ())
            })?;
            println!(
                "{}",
                style::success(&format!("Removed project: {private_path}"))
            );
            Ok(())
        }
        Commands::AddFile {
            private_path,
            public_path,
        } => {
            let mut file = FileMapping::new(private_path);
            file.public_path = public_path;
            let label = file.private_path.clone();
            edit_config(&cli.config, |config| config.add_file(file))?;
            println!("{}", style::success(&format!("Added file: {label}")));
            Ok(())
        }
        Commands::RemoveFile { private_path } => {
            edit_config(&cli.config, |config| {
                config.remove_file(&private_path).map(|_| ())
            })?;
            println!("{}", style::success(&format!("Removed file: {private_path}")));
            Ok(())
        }
        Commands::List => cmd_list(&load_config(&cli.config)?, cli.json),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<SyncConfig> {
    debug!(path = %path.display(), "loading configuration");
    SyncConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// Load, apply one mapping edit, validate, and write the file back.
fn edit_config<F>(path: &Path, edit: F) -> Result<()>
where
    F: FnOnce(&mut SyncConfig) -> Result<(), ConfigError>,
{
    let mut config = load_config(path)?;
    edit(&mut config)?;
    config.validate().context("edited configuration is invalid")?;
    config
        .save_to_file(path)
        .context("failed to write configuration file")?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to encode JSON")?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(
    output: &Path,
    private_repo: Option<PathBuf>,
    public_url: Option<String>,
    force: bool,
) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "file already exists: {}. Use --force or a different --config path.",
            output.display()
        );
    }

    match (private_repo, public_url) {
        (Some(private_repo), Some(public_url)) => {
            let config = SyncConfig::new(private_repo, public_url);
            config.validate().context("invalid repository settings")?;
            config
                .save_to_file(output)
                .context("failed to write config file")?;
        }
        (None, None) => {
            std::fs::write(output, SyncConfig::default_template())
                .context("failed to write config file")?;
        }
        _ => anyhow::bail!("--private-repo and --public-url must be given together"),
    }

    println!(
        "{}",
        style::success(&format!("Configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the repository settings and mappings");
    println!("  2. Add directories with: monosync add-project <path>");
    println!("  3. Check pending work with: monosync preview");
    Ok(())
}

fn cmd_sync(
    syncer: &RepoSyncer,
    direction: SyncDirection,
    dry_run: bool,
    full: bool,
    json: bool,
) -> Result<()> {
    let reporter = SpinnerReporter::new(!json);
    let result = if full {
        syncer.run_full(direction, dry_run, &reporter)
    } else {
        syncer.run(direction, dry_run, &reporter)
    };
    reporter.finish();

    if json {
        print_json(&result)?;
    } else {
        print_summary(direction, &result);
    }

    if !result.success {
        anyhow::bail!("sync finished with errors");
    }
    Ok(())
}

fn print_summary(direction: SyncDirection, result: &SyncResult) {
    println!();
    let title = if result.dry_run {
        format!("Sync summary {} (dry run)", style::direction(direction))
    } else {
        format!("Sync summary {}", style::direction(direction))
    };
    println!("{}", style::header(&title));
    let verb = if result.dry_run { "would sync" } else { "synced" };
    println!("  Commits {verb:<11} {}", result.commits_synced);
    println!("  Commits skipped     {}", result.commits_skipped);
    println!("  Files changed       {}", result.files_changed);

    for warning in &result.warnings {
        println!("{}", style::warn(warning));
    }
    for error in &result.errors {
        println!("{}", style::error(error));
    }
    if result.success {
        println!("{}", style::success("Done"));
    }
    println!();
}

fn cmd_preview(syncer: &RepoSyncer, direction: SyncDirection, json: bool) -> Result<()> {
    let preview = syncer
        .preview(direction)
        .context("failed to compute pending commits")?;
    if json {
        return print_json(&preview);
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Preview {}", style::direction(direction)))
    );
    let resume = match &preview.resume_point {
        Some(hash) => style::hash(hash),
        None => style::dim("none (full history)"),
    };
    println!("  Last synced   {resume}");
    println!("  Pending       {}", preview.pending.len());
    if preview.echoes > 0 {
        println!(
            "  Echoes        {} {}",
            preview.echoes,
            style::dim("(will be skipped)")
        );
    }
    println!();

    if preview.pending.is_empty() {
        println!("{}", style::success("Nothing to sync"));
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Date", "Author", "Summary", "Files"]);
    for commit in preview.pending.iter().take(PREVIEW_LIMIT) {
        table.add_row(vec![
            Cell::new(&commit.short_hash).fg(comfy_table::Color::Cyan),
            Cell::new(style::timestamp(&commit.author_date)),
            Cell::new(&commit.author_name),
            Cell::new(commit.summary()),
            Cell::new(commit.files_changed.len()),
        ]);
    }
    println!("{table}");
    if preview.pending.len() > PREVIEW_LIMIT {
        println!(
            "{}",
            style::dim(&format!(
                "  ... and {} more",
                preview.pending.len() - PREVIEW_LIMIT
            ))
        );
    }

    if !preview.affected.is_empty() {
        println!();
        println!("{}", style::header("Affected mappings"));
        for (path, count) in &preview.affected {
            println!("  {path}: {count} file change(s)");
        }
    }
    println!();
    Ok(())
}

fn cmd_status(syncer: &RepoSyncer, config_path: &Path, json: bool) -> Result<()> {
    let status = syncer.status().context("failed to open repositories")?;
    if json {
        return print_json(&status);
    }

    let config = syncer.config();
    println!();
    println!("{}", style::header("monosync status"));
    println!("{}", "═".repeat(15));
    println!("  Config        {}", config_path.display());
    println!("  Private       {}", config.private_repo_path().display());
    println!("  Public        {}", redact_url(&config.public_repo_url));
    println!("  Public clone  {}", config.public_repo_path().display());
    println!("  Prefix        {}", config.commit_prefix);
    println!(
        "  Projects      {} enabled / {} total",
        config.enabled_projects().count(),
        config.projects.len()
    );
    println!(
        "  Files         {} enabled / {} total",
        config.enabled_files().count(),
        config.files.len()
    );
    println!();

    for entry in &status {
        println!("  {}", style::direction(entry.direction));
        let last = match &entry.last_synced {
            Ok(Some(hash)) => style::hash(hash),
            Ok(None) => style::dim("never"),
            Err(e) => style::error(e),
        };
        let pending = match &entry.pending {
            Ok(n) => n.to_string(),
            Err(e) => style::error(e),
        };
        println!("    Last synced   {last}");
        println!("    Pending       {pending}");
    }
    println!();
    Ok(())
}

fn cmd_list(config: &SyncConfig, json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "projects": config.projects,
            "files": config.files,
        }));
    }

    if config.projects.is_empty() && config.files.is_empty() {
        println!("{}", style::warn("No projects or files configured."));
        return Ok(());
    }

    if !config.projects.is_empty() {
        println!();
        println!("{}", style::header("Projects (directories)"));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Private path", "Public path", "Status", "Excludes", "Includes"]);
        for project in &config.projects {
            table.add_row(vec![
                Cell::new(&project.private_path),
                Cell::new(project.resolved_public_path()),
                Cell::new(style::enabled(project.enabled)),
                Cell::new(project.exclude_patterns.join(", ")),
                Cell::new(project.include_patterns.join(", ")),
            ]);
        }
        println!("{table}");
    }

    if !config.files.is_empty() {
        println!();
        println!("{}", style::header("Files"));
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Private path", "Public path", "Status"]);
        for file in &config.files {
            table.add_row(vec![
                Cell::new(&file.private_path),
                Cell::new(file.resolved_public_path()),
                Cell::new(style::enabled(file.enabled)),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}

fn cmd_reset_state() -> Result<()> {
    println!();
    println!("{}", style::header("Sync state"));
    println!(
        "monosync keeps no state file. Each replicated commit ends with a {} trailer,",
        style::hash("synced_from: <hash>")
    );
    println!("and every run resumes from the newest trailer in the destination history.");
    println!();
    println!("{}", style::header("To re-sync from scratch"));
    println!("  monosync sync --direction private-to-public --full");
    println!();
    println!("This copies every mapped file from the current source tree in one commit,");
    println!("regardless of earlier sync history.");
    println!();
    Ok(())
}
