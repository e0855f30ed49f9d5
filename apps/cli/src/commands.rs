//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use rosterbook_core::pipeline::{ImportOutcome, ProgressReporter};
use rosterbook_core::stats::format_minutes;
use rosterbook_shared::{db_path, init_config, load_config, AppConfig, ImportKind};
use rosterbook_storage::{StatsFilter, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rosterbook — import crew duty rosters into a local database.
#[derive(Parser)]
#[command(
    name = "rosterbook",
    version,
    about = "Import crew duty-roster booklets and report per-series statistics.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import a roster booklet or a location seed file.
    Import {
        /// File to import: booklet stream text, or a JSON station seed file.
        file: PathBuf,

        /// File kind; inferred from the extension when omitted
        /// (.json → locations, anything else → roster).
        #[arg(short, long)]
        kind: Option<KindArg>,
    },

    /// Show per-series duty statistics.
    Stats {
        /// Restrict to one depot code.
        #[arg(long)]
        depot: Option<String>,

        /// Restrict to one applicability date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// Restrict to one cycle series.
        #[arg(long)]
        series: Option<String>,
    },

    /// List import job history, most recent first.
    Jobs {
        /// Maximum number of jobs to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Import file kind flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum KindArg {
    Roster,
    Locations,
}

impl From<KindArg> for ImportKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Roster => ImportKind::Roster,
            KindArg::Locations => ImportKind::Locations,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "rosterbook=info",
        1 => "rosterbook=debug",
        _ => "rosterbook=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import { file, kind } => cmd_import(&file, kind).await,
        Command::Stats {
            depot,
            date,
            series,
        } => cmd_stats(depot, date, series).await,
        Command::Jobs { limit } => cmd_jobs(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn open_storage() -> Result<Storage> {
    let config = load_config()?;
    let path = db_path(&config)?;
    Ok(Storage::open(&path).await?)
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Pick the import kind from the flag or the file extension.
fn resolve_kind(file: &Path, kind: Option<KindArg>) -> ImportKind {
    if let Some(kind) = kind {
        return kind.into();
    }
    match file.extension().and_then(|e| e.to_str()) {
        Some("json") => ImportKind::Locations,
        _ => ImportKind::Roster,
    }
}

async fn cmd_import(file: &Path, kind: Option<KindArg>) -> Result<()> {
    let kind = resolve_kind(file, kind);
    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let input = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;

    let storage = open_storage().await?;

    info!(file = %file.display(), kind = %kind, "starting import");

    match kind {
        ImportKind::Roster => {
            let reporter = CliProgress::new();
            let outcome =
                rosterbook_core::pipeline::import_roster(&storage, &source, &input, &reporter)
                    .await?;

            println!();
            println!("  Roster imported!");
            println!(
                "  Depot:      {}",
                outcome.depot_code.as_deref().unwrap_or("(not found)")
            );
            println!("  Date:       {}", outcome.date);
            println!("  Blocks:     {}", outcome.blocks_total);
            println!("  Created:    {}", outcome.created);
            println!("  Duplicates: {}", outcome.duplicates);
            if outcome.skipped > 0 {
                println!("  Skipped:    {} (depot not in registry)", outcome.skipped);
            }
            println!("  Invalid:    {}", outcome.invalid);
            println!("  Series:     {}", outcome.series.join(", "));
            if outcome.coverage_gap > 0 {
                println!("  Warning:    {} cycle tokens not captured", outcome.coverage_gap);
            }
            println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
            println!();
        }
        ImportKind::Locations => {
            let outcome =
                rosterbook_core::locations::import_locations(&storage, &source, &input).await?;

            println!();
            println!("  Locations imported!");
            println!("  Total:   {}", outcome.total);
            println!("  Created: {}", outcome.created);
            println!("  Skipped: {}", outcome.skipped);
            println!();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn block_processed(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Persisting duties [{current}/{total}]"));
    }

    fn done(&self, _outcome: &ImportOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Stats / jobs / config
// ---------------------------------------------------------------------------

async fn cmd_stats(
    depot: Option<String>,
    date: Option<String>,
    series: Option<String>,
) -> Result<()> {
    if let Some(d) = &date {
        chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| eyre!("invalid date '{d}' (expected YYYY-MM-DD): {e}"))?;
    }

    let storage = open_storage().await?;
    let filter = StatsFilter {
        depot_code: depot,
        date,
        series,
    };

    let rows = rosterbook_core::stats::series_report(&storage, &filter).await?;
    if rows.is_empty() {
        println!("No duties match the given filters.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<8} {:>6} {:>10} {:>8} {:>8} {:>8} {:>9}",
        "Series", "Duties", "Amplitude", "Drive", "Active", "Reserve", "Dead-head"
    );
    for row in rows {
        println!(
            "  {:<8} {:>6} {:>10} {:>8} {:>8} {:>8} {:>9}",
            row.series,
            row.duty_count,
            format_minutes(row.avg_amplitude_min),
            format_minutes(row.avg_drive_min),
            format_minutes(row.avg_active_min),
            format_minutes(row.avg_reserve_min),
            format_minutes(row.avg_deadhead_min),
        );
    }
    println!();

    Ok(())
}

async fn cmd_jobs(limit: u32) -> Result<()> {
    let storage = open_storage().await?;
    let jobs = storage.list_import_jobs(limit).await?;

    if jobs.is_empty() {
        println!("No import jobs recorded.");
        return Ok(());
    }

    println!();
    for job in jobs {
        println!(
            "  {} [{:<8}] {:<10} {}",
            job.started_at,
            job.status.as_str(),
            job.kind,
            job.source
        );
        if let Some(log) = job.log {
            println!("      {log}");
        }
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_inferred_from_extension() {
        assert_eq!(
            resolve_kind(Path::new("gares.json"), None),
            ImportKind::Locations
        );
        assert_eq!(
            resolve_kind(Path::new("juin.txt"), None),
            ImportKind::Roster
        );
        assert_eq!(resolve_kind(Path::new("booklet"), None), ImportKind::Roster);
    }

    #[test]
    fn explicit_kind_wins_over_extension() {
        assert_eq!(
            resolve_kind(Path::new("gares.json"), Some(KindArg::Roster)),
            ImportKind::Roster
        );
    }
}
