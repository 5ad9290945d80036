//! eavclean CLI
//!
//! Host for the reconciliation engine:
//! - resolves the entity type, storage edition and table set
//! - validates the target store (scope) id against the database
//! - gates destructive runs behind `--force` or an interactive confirmation
//! - streams audit lines to stdout, logs to stderr
//!
//! Exit status: 0 success, 1 precondition failure, 2 storage failure.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use eavclean_core::{
    run_reconciliation, EntityType, ReconcileError, ReconcileOptions, ScopeId, SqliteOptions,
    SqliteStore, StoreError, ValueStore, ValueTableDescriptor, WriteSink, DEFAULT_SCOPE,
};
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;

use config::{CleanerConfig, ConfigOverrides};

const ENTITY_HINT: &str =
    "Please specify the entity with --entity. Possible options are product or category";
const NOT_INTERACTIVE: &str = "ERROR: neither --dry-run nor --force options were supplied, and we are not running interactively.";
const NOT_DRY_RUN_WARNING: &str =
    "WARNING: this is not a dry run. If you want to do a dry-run, add --dry-run.";
const CONFIRM_PROMPT: &str = "Are you sure you want to continue? [No] ";

#[derive(Parser)]
#[command(name = "eavclean")]
#[command(
    author,
    version,
    about = "Reconcile store-scoped EAV attribute values with their default values"
)]
struct Cli {
    /// JSON config file; command-line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write store values into the default value where they differ, remove
    /// the store values, then remove NULL store values.
    ///
    /// Store values identical to the default are left in place unless
    /// `--remove-identical` is given.
    OverrideDefault {
        #[command(flatten)]
        run: RunArgs,
        /// Also remove store values identical to the default value
        #[arg(long)]
        remove_identical: bool,
    },

    /// Remove store values identical to the default value, then remove
    /// NULL store values. Default values are never changed.
    PruneIdentical {
        #[command(flatten)]
        run: RunArgs,
    },

    /// List the value tables a run would process, in order.
    Tables {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Clone)]
struct TargetArgs {
    /// Entity to clean up (product or category)
    #[arg(long, default_value = "product")]
    entity: String,
    /// SQLite database holding the value tables
    #[arg(long)]
    database: Option<PathBuf>,
    /// Storage edition: community (entity_id) or enterprise (row_id)
    #[arg(long)]
    edition: Option<String>,
    /// Table name prefix
    #[arg(long)]
    table_prefix: Option<String>,
}

#[derive(Args, Clone)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Store id whose values override the default
    #[arg(long)]
    store_id: Option<String>,
    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,
    /// Skip the confirmation prompt
    #[arg(long)]
    force: bool,
    /// Rows fetched per query page
    #[arg(long)]
    batch_size: Option<usize>,
    /// Write the final report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

/// Input problem reported verbatim on stdout (exit status 1).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct PreconditionFailed(String);

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

fn run(cli: Cli) -> Result<()> {
    let (target, batch_size) = match &cli.command {
        Commands::OverrideDefault { run, .. } | Commands::PruneIdentical { run } => {
            (run.target.clone(), run.batch_size)
        }
        Commands::Tables { target } => (target.clone(), None),
    };
    let config = CleanerConfig::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            database: target.database.clone(),
            edition: target.edition.clone(),
            table_prefix: target.table_prefix.clone(),
            batch_size,
        },
    )?;
    logging::init(logging::level_for(
        cli.verbose,
        cli.quiet,
        config.log_level.as_deref(),
    )?)?;

    match cli.command {
        Commands::OverrideDefault {
            run,
            remove_identical,
        } => cmd_clean(&config, &run, true, remove_identical),
        Commands::PruneIdentical { run } => cmd_clean(&config, &run, false, true),
        Commands::Tables { target } => cmd_tables(&config, &target),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_tables(config: &CleanerConfig, target: &TargetArgs) -> Result<()> {
    let tables = resolve_tables(config, target)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for table in &tables {
        writeln!(
            out,
            "{}\t{}\t{}",
            table.name(),
            table.category(),
            table.entity_column()
        )?;
    }
    Ok(())
}

fn cmd_clean(
    config: &CleanerConfig,
    args: &RunArgs,
    promote_overrides: bool,
    remove_identical: bool,
) -> Result<()> {
    let tables = resolve_tables(config, &args.target)?;

    let store = SqliteStore::open(
        &config.database,
        &SqliteOptions {
            busy_timeout_ms: config.busy_timeout_ms,
            table_prefix: config.table_prefix.clone(),
            must_exist: true,
        },
    )
    .with_context(|| format!("failed to open database {}", config.database.display()))?;

    let scope = resolve_scope(&store, args.store_id.as_deref())?;
    confirm_destructive_run(args.dry_run, args.force)?;

    let options = ReconcileOptions::new(scope)
        .dry_run(args.dry_run)
        .page_size(config.batch_size)
        .promote_overrides(promote_overrides)
        .remove_identical(remove_identical);
    tracing::info!(
        database = %config.database.display(),
        scope,
        dry_run = options.dry_run,
        tables = tables.len(),
        "starting reconciliation"
    );

    let stdout = io::stdout();
    let mut sink = WriteSink::new(stdout.lock());
    let report = run_reconciliation(&store, &tables, &options, &mut sink)?;
    sink.into_inner().flush()?;

    eprint!("{}", report.summarize());
    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }
    Ok(())
}

// ============================================================================
// Preconditions
// ============================================================================

fn resolve_tables(config: &CleanerConfig, target: &TargetArgs) -> Result<Vec<ValueTableDescriptor>> {
    let entity: EntityType = target
        .entity
        .parse()
        .map_err(|_| PreconditionFailed(ENTITY_HINT.to_string()))?;
    Ok(ValueTableDescriptor::all_for(
        entity,
        config.edition()?,
        &config.table_prefix,
    )?)
}

fn resolve_scope(store: &impl ValueStore, raw: Option<&str>) -> Result<ScopeId> {
    let Some(raw) = raw else {
        return Err(PreconditionFailed(
            "Please specify the store id with --store-id".to_string(),
        )
        .into());
    };
    let missing = || PreconditionFailed(format!("Store with store id {raw} does not exist."));
    let scope: ScopeId = raw.trim().parse().map_err(|_| missing())?;
    if scope == DEFAULT_SCOPE {
        return Err(ReconcileError::DefaultScope(scope).into());
    }
    let exists = store
        .scope_exists(scope)
        .map_err(|source| ReconcileError::ScopeLookup { scope, source })?;
    if !exists {
        return Err(missing().into());
    }
    Ok(scope)
}

fn confirm_destructive_run(dry_run: bool, force: bool) -> Result<()> {
    if dry_run || force {
        return Ok(());
    }
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(PreconditionFailed(NOT_INTERACTIVE.to_string()).into());
    }

    println!("{}", NOT_DRY_RUN_WARNING.yellow());
    print!("{CONFIRM_PROMPT}");
    io::stdout().flush()?;
    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    if is_affirmative(&answer) {
        Ok(())
    } else {
        Err(PreconditionFailed("Aborted.".to_string()).into())
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ============================================================================
// Exit status
// ============================================================================

fn is_storage_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.is::<StoreError>()
            || cause
                .downcast_ref::<ReconcileError>()
                .is_some_and(|e| !e.is_precondition())
    })
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    if let Some(precondition) = err.downcast_ref::<PreconditionFailed>() {
        println!("{precondition}");
        return ExitCode::from(1);
    }
    eprintln!("{} {err:#}", "error:".red().bold());
    if is_storage_failure(err) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}
