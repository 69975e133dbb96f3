use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use style_patcher::{
    AppliedAction, AppliedChange, ApplyStatus, ChangeAction, DiffKind, Issue, IssueKind,
    PatchIntent, PatchService, ProjectRegistry, PropertyChange, RollbackTarget,
};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "STYLE_PATCHER_CONFIG";
const LOG_ENV: &str = "STYLE_PATCHER_LOG";
const DEFAULT_CONFIG_FILE: &str = "style-patcher.toml";

#[derive(Parser)]
#[command(name = "style-patcher")]
#[command(about = "Source-aware stylesheet patching with backups and rollback", long_about = None)]
#[command(version)]
struct Cli {
    /// Project registry file (defaults to $STYLE_PATCHER_CONFIG, then ./style-patcher.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct IntentArgs {
    /// Project id from the registry
    #[arg(short, long)]
    project: String,

    /// Patch intent JSON file (`-` for stdin)
    #[arg(short, long, conflicts_with_all = ["selector", "element", "change"])]
    intent: Option<PathBuf>,

    /// Target selector
    #[arg(short, long)]
    selector: Option<String>,

    /// Generic element identifier, used when no selector is given
    #[arg(short, long)]
    element: Option<String>,

    /// Property change: `[add:|modify:|remove:]property[=value]`, repeatable, applied in order
    #[arg(short = 'C', long = "change", value_parser = parse_change)]
    change: Vec<PropertyChange>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch intent to the located stylesheet
    Apply(IntentArgs),

    /// Show the diff a patch intent would produce without writing
    Preview(IntentArgs),

    /// Restore a file from a backup
    Rollback {
        #[arg(short, long)]
        project: String,

        /// Backup file to restore from
        #[arg(short, long)]
        backup: PathBuf,

        /// Project-relative file to restore
        #[arg(short, long, conflicts_with = "selector", required_unless_present = "selector")]
        file: Option<PathBuf>,

        /// Selector whose stylesheet should be restored
        #[arg(short, long)]
        selector: Option<String>,
    },

    /// List backups of a project, newest first
    Backups {
        #[arg(short, long)]
        project: String,
    },

    /// Resolve a selector to a file and line
    Locate {
        #[arg(short, long)]
        project: String,

        selector: String,
    },

    /// Show the structure index of a project
    Index {
        #[arg(short, long)]
        project: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = load_registry(cli.config.as_deref())?;
    let service = PatchService::new(&registry);

    let ok = match cli.command {
        Commands::Apply(args) => cmd_apply(&service, args, cli.json)?,
        Commands::Preview(args) => cmd_preview(&service, args, cli.json)?,
        Commands::Rollback {
            project,
            backup,
            file,
            selector,
        } => {
            let target = match (file, selector) {
                (Some(file), _) => RollbackTarget::File(file),
                (None, Some(selector)) => RollbackTarget::Selector(selector),
                (None, None) => anyhow::bail!("either --file or --selector is required"),
            };
            cmd_rollback(&service, &project, &target, &backup, cli.json)?
        }
        Commands::Backups { project } => cmd_backups(&service, &project, cli.json)?,
        Commands::Locate { project, selector } => {
            cmd_locate(&service, &project, &selector, cli.json)?
        }
        Commands::Index { project } => cmd_index(&service, &project, cli.json)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the registry file
///
/// Priority order:
/// 1. Explicit --config flag
/// 2. STYLE_PATCHER_CONFIG environment variable
/// 3. ./style-patcher.toml
fn load_registry(cli_config: Option<&Path>) -> Result<ProjectRegistry> {
    let path = match cli_config {
        Some(path) => path.to_path_buf(),
        None => match env::var(CONFIG_ENV) {
            Ok(env_path) if !env_path.trim().is_empty() => PathBuf::from(env_path),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        },
    };

    if !path.exists() {
        anyhow::bail!(
            "{}\n{}\n  {}\n  {}",
            format!("Project registry not found: {}", path.display()).red(),
            "Try one of:".bold(),
            "1. Pass it explicitly: style-patcher --config path/to/style-patcher.toml ...",
            "2. Set environment variable: export STYLE_PATCHER_CONFIG=path/to/style-patcher.toml"
        );
    }

    Ok(ProjectRegistry::load(&path)?)
}

/// Parse `[action:]property[=value]`.
fn parse_change(raw: &str) -> Result<PropertyChange, String> {
    let (action, rest) = match raw.split_once(':') {
        Some(("add", rest)) => (ChangeAction::Add, rest),
        Some(("modify", rest)) => (ChangeAction::Modify, rest),
        Some(("remove", rest)) => (ChangeAction::Remove, rest),
        _ => (ChangeAction::Modify, raw),
    };
    let (property, value) = rest.split_once('=').unwrap_or((rest, ""));
    if property.trim().is_empty() {
        return Err(format!("missing property name in '{raw}'"));
    }
    if action != ChangeAction::Remove && value.trim().is_empty() {
        return Err(format!("missing value in '{raw}' (expected property=value)"));
    }
    Ok(PropertyChange::new(property.trim(), value.trim(), action))
}

fn build_intent(args: IntentArgs) -> Result<PatchIntent> {
    if let Some(path) = args.intent {
        let raw = if path == Path::new("-") {
            std::io::read_to_string(std::io::stdin()).context("failed to read intent from stdin")?
        } else {
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read intent {}", path.display()))?
        };
        return PatchIntent::from_json(&raw).context("invalid patch intent JSON");
    }

    if args.change.is_empty() {
        anyhow::bail!("no changes given; use --change or --intent");
    }
    let mut intent = match (args.selector, args.element) {
        (Some(selector), element) => PatchIntent {
            target_element: element.unwrap_or_default(),
            ..PatchIntent::new(selector, args.change)
        },
        (None, Some(element)) => PatchIntent::for_element(element, args.change),
        (None, None) => anyhow::bail!("either --selector or --element is required"),
    };
    intent.status = Some("pending".to_string());
    Ok(intent)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_issues(issues: &[Issue], failed: bool) {
    for issue in issues {
        if failed {
            eprintln!("  {}", issue.to_string().red());
        } else {
            eprintln!("  {} {}", "⊙".yellow(), issue);
        }
    }
}

fn print_changes(changes: &[AppliedChange]) {
    for change in changes {
        let line = match change.action {
            AppliedAction::Added => format!(
                "+ {}: {}",
                change.property,
                change.new_value.as_deref().unwrap_or_default()
            )
            .green(),
            AppliedAction::Modified => format!(
                "~ {}: {} → {}",
                change.property,
                change.old_value.as_deref().unwrap_or_default(),
                change.new_value.as_deref().unwrap_or_default()
            )
            .yellow(),
            AppliedAction::Removed => format!("- {}", change.property).red(),
        };
        println!("  {line}");
    }
}

fn cmd_apply(service: &PatchService<'_>, args: IntentArgs, json: bool) -> Result<bool> {
    let project = args.project.clone();
    let intent = build_intent(args)?;
    let result = service.apply(&project, &intent);

    if json {
        print_json(&result)?;
        return Ok(result.success);
    }

    let file = result
        .file_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());

    if result.success {
        println!(
            "{} {}: {}",
            "✓".green(),
            file,
            "APPLIED".green().bold()
        );
        if let Some(selector) = &result.selector {
            println!("  Selector: {selector}");
        }
        print_changes(&result.changes_applied);
        print_issues(&result.errors, false);
    } else {
        eprintln!("{} {}: Failed ({:?})", "✗".red(), file, result.status);
        print_issues(&result.errors, true);
        let same_second = result.status == ApplyStatus::BackupFailed
            && result
                .errors
                .iter()
                .any(|issue| issue.kind == IssueKind::PatchConflict);
        if same_second {
            eprintln!(
                "  {}",
                "Snapshots are per second and never overwritten; the file is untouched, run the same command again."
                    .yellow()
            );
        }
    }
    if let Some(backup) = &result.backup_path {
        println!("  {}", format!("Backup: {}", backup.display()).dimmed());
    }

    Ok(result.success)
}

fn cmd_preview(service: &PatchService<'_>, args: IntentArgs, json: bool) -> Result<bool> {
    let project = args.project.clone();
    let intent = build_intent(args)?;
    let preview = service.preview(&project, &intent);

    if json {
        print_json(&preview)?;
        return Ok(preview.success);
    }

    if !preview.success {
        eprintln!("{} Preview failed", "✗".red());
        print_issues(&preview.errors, true);
        return Ok(false);
    }

    for line in &preview.formatted_diff {
        let rendered = match line.kind {
            DiffKind::Header => line.content.dimmed(),
            DiffKind::Added => format!("+{}", line.content).green(),
            DiffKind::Removed => format!("-{}", line.content).red(),
            DiffKind::Context => format!(" {}", line.content).normal(),
        };
        println!("{rendered}");
    }
    if preview.formatted_diff.is_empty() {
        println!("{}", "No changes".yellow());
    }

    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} added",
        format!("{}", preview.statistics.added_lines).green()
    );
    println!(
        "  {} removed",
        format!("{}", preview.statistics.removed_lines).red()
    );
    println!("  {} lines after patch", preview.statistics.line_count);
    print_issues(&preview.errors, false);

    Ok(true)
}

fn cmd_rollback(
    service: &PatchService<'_>,
    project: &str,
    target: &RollbackTarget,
    backup: &Path,
    json: bool,
) -> Result<bool> {
    let result = service.rollback(project, target, backup);

    if json {
        print_json(&result)?;
        return Ok(result.success);
    }

    let file = result
        .file_path
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    if result.success {
        println!("{} {}: Restored from {}", "✓".green(), file, backup.display());
    } else {
        eprintln!("{} {}: Rollback failed", "✗".red(), file);
        print_issues(&result.errors, true);
    }
    Ok(result.success)
}

fn cmd_backups(service: &PatchService<'_>, project: &str, json: bool) -> Result<bool> {
    let backups = match service.list_backups(project) {
        Ok(backups) => backups,
        Err(issue) => {
            eprintln!("{} {}", "✗".red(), issue);
            return Ok(false);
        }
    };

    if json {
        print_json(&backups)?;
        return Ok(true);
    }

    if backups.is_empty() {
        println!("{}", "No backups".yellow());
        return Ok(true);
    }
    for backup in &backups {
        println!(
            "{}  {}  {} bytes",
            backup.timestamp_label.cyan(),
            backup.relative_path.display(),
            backup.size
        );
        println!("  {}", backup.backup_path.display().to_string().dimmed());
    }
    Ok(true)
}

fn cmd_locate(
    service: &PatchService<'_>,
    project: &str,
    selector: &str,
    json: bool,
) -> Result<bool> {
    let location = match service.locate(project, selector) {
        Ok(location) => location,
        Err(issue) => {
            eprintln!("{} {}", "✗".red(), issue);
            return Ok(false);
        }
    };

    if json {
        print_json(&location)?;
        return Ok(true);
    }

    let marker = if location.kind.is_fallback() {
        "⊙".yellow()
    } else {
        "✓".green()
    };
    println!(
        "{} {} → {}:{}",
        marker,
        selector,
        location.relative_path.display(),
        location.line
    );
    println!(
        "  {}",
        format!(
            "matched '{}' ({:?}, confidence {:.1})",
            location.selector, location.kind, location.confidence
        )
        .dimmed()
    );
    Ok(true)
}

fn cmd_index(service: &PatchService<'_>, project: &str, json: bool) -> Result<bool> {
    let index = match service.index(project) {
        Ok(index) => index,
        Err(issue) => {
            eprintln!("{} {}", "✗".red(), issue);
            return Ok(false);
        }
    };

    if json {
        print_json(&index)?;
        return Ok(true);
    }

    for file in &index.files {
        println!(
            "{} ({} selectors, {} lines)",
            file.path.display().to_string().bold(),
            file.selectors.len(),
            file.line_count
        );
        if !file.imports.is_empty() {
            println!("  imports: {}", file.imports.join(", "));
        }
        if !file.custom_properties.is_empty() {
            println!("  custom properties: {}", file.custom_properties.join(", "));
        }
        for record in &file.selectors {
            println!(
                "  {:>5}  {}  {}",
                record.line,
                record.selector.replace('\n', " "),
                format!("[{}]", record.properties.join(", ")).dimmed()
            );
        }
    }
    for skipped in &index.skipped {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            skipped.path.display(),
            skipped.reason
        );
    }
    if !index.components.is_empty() {
        println!("{}", "Components:".bold());
        for component in &index.components {
            println!("  {}", component.display());
        }
    }
    Ok(true)
}
