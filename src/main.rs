// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use tr4ck::utils::logging::{
    format_error, format_hit, format_info, format_revision_range, format_success, format_warning,
};
use tr4ck::{
    Config, FullScan, Git2Backend, RegistryStore, RunSummary, SyncOrchestrator,
    SyncOutcome,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tr4ck")]
#[command(version)]
#[command(about = "Track technical-debt markers across git repositories", long_about = None)]
struct Cli {
    /// Configuration file, defaults to ~/.tr4ck.conf
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every tracked repository for markers added since the last run
    Sync {
        #[arg(long)]
        json: bool,
    },

    /// Scan a whole repository once without tracking it
    Scan {
        uri: String,

        #[arg(long)]
        json: bool,
    },

    /// Create an empty registry file
    Init,

    /// Manage tracked repositories
    #[command(alias = "reg")]
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    Version,
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Track a repository starting from its root revision
    Add { uri: String },

    /// List tracked repositories
    #[command(alias = "list")]
    Ls,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tr4ck::utils::logging::init_logger(cli.color, cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Sync { json: false }) {
        Commands::Sync { json } => cmd_sync(&config, json)?,
        Commands::Scan { uri, json } => cmd_scan(&config, &uri, json)?,
        Commands::Init => cmd_init(&config)?,
        Commands::Registry { action } => match action {
            RegistryAction::Add { uri } => cmd_registry_add(&config, &uri)?,
            RegistryAction::Ls => cmd_registry_ls(&config)?,
        },
        Commands::Version => {
            println!("tr4ck {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn cmd_sync(config: &Config, json: bool) -> Result<()> {
    info!("Registry: {}", config.registry.path.display());

    // Network operations are bounded by `backend.timeout_secs`.
    let backend = Git2Backend::new(config.backend.clone());
    let orchestrator = SyncOrchestrator::new(&backend, config)
        .with_progress(!json && std::io::stderr().is_terminal());

    let summary = orchestrator.run().context("Sync failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.reported() > 0 {
        anyhow::bail!("{} of {} repositories failed to sync", summary.reported(), summary.records.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for record in &summary.records {
        match &record.outcome {
            SyncOutcome::Skipped { .. } => {
                println!("{}", format_info(&format!("{} is up to date", record.uri)));
            }
            SyncOutcome::Committed {
                from,
                head,
                changes,
                scan,
            } => {
                println!(
                    "{} {}",
                    format_success(&format!(
                        "{}: {} changed, {} removed",
                        record.uri,
                        changes.changed.len(),
                        changes.removed.len()
                    )),
                    format_revision_range(from, head)
                );
                for hit in &scan.hits {
                    println!("{}", format_hit(&hit.path, &hit.marker));
                }
                for failure in &scan.failures {
                    println!(
                        "  {}",
                        format_warning(&format!("{}: {}", failure.path, failure.reason))
                    );
                }
            }
            SyncOutcome::Reported { stage, error } => {
                println!(
                    "{}",
                    format_error(&format!("{} failed at {:?}: {}", record.uri, stage, error))
                );
            }
        }
    }

    println!(
        "{}",
        format_info(&format!(
            "{} repositories: {} synced, {} up to date, {} failed, {} files with markers",
            summary.records.len(),
            summary.committed(),
            summary.skipped(),
            summary.reported(),
            summary.total_hits()
        ))
    );
}

fn cmd_scan(config: &Config, uri: &str, json: bool) -> Result<()> {
    let backend = Git2Backend::new(config.backend.clone());
    let orchestrator = SyncOrchestrator::new(&backend, config);

    let scan: FullScan = orchestrator
        .scan_repository(uri)
        .with_context(|| format!("Failed to scan {}", uri))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }

    for hit in &scan.report.hits {
        println!("{}", format_hit(&hit.path, &hit.marker));
    }
    for failure in &scan.report.failures {
        warn!("Could not scan {}: {}", failure.path, failure.reason);
    }
    println!(
        "{}",
        format_info(&format!(
            "{} files scanned at {}, {} with markers",
            scan.report.files_scanned,
            scan.head,
            scan.report.hits.len()
        ))
    );
    Ok(())
}

fn cmd_init(config: &Config) -> Result<()> {
    let store = RegistryStore::new(config.registry.path.clone());
    if store.init().context("Failed to create registry")? {
        println!(
            "{}",
            format_success(&format!("Created {}", store.path().display()))
        );
    } else {
        println!(
            "{}",
            format_warning(&format!("{} already exists", store.path().display()))
        );
    }
    Ok(())
}

fn cmd_registry_add(config: &Config, uri: &str) -> Result<()> {
    let backend = Git2Backend::new(config.backend.clone());
    let record = SyncOrchestrator::new(&backend, config)
        .register(uri)
        .with_context(|| format!("Failed to register {}", uri))?;

    println!("{}", format_success(&format!("Tracking {}", record)));
    Ok(())
}

fn cmd_registry_ls(config: &Config) -> Result<()> {
    let store = RegistryStore::new(config.registry.path.clone());
    let records = store.load().context("Failed to read registry")?;

    if records.is_empty() {
        println!("{}", format_info("No repositories tracked"));
    }
    for record in &records {
        println!("{}", record);
    }
    Ok(())
}
