//! Engagement Insights CLI Application
//!
//! Command-line front end for the engagement-core library. It adds:
//! - Snapshot loading from a file or stdin
//! - Filter selection from flags and config.toml
//! - Text and JSON reports for every dashboard series and relation lookup

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use engagement_core::{
    filter_view, AgeBand, Analytics, EngineConfig, EntityId, EntityKind, FilterState,
    Relations, Snapshot,
};
use std::io;
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::emit;

/// Engagement Insights - Filter and aggregate event participation snapshots
#[derive(Parser, Debug)]
#[command(name = "engagement-cli")]
#[command(about = "Filter and aggregate event participation snapshots", long_about = None)]
#[command(version)]
struct Args {
    /// Snapshot document (JSON) to load, or "-" to read stdin
    #[arg(short, long, value_name = "FILE")]
    snapshot: PathBuf,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep only users whose account flag matches
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    has_account: Option<bool>,

    /// Keep only users in an age band (under18, 18to24, 25to40, 41to59, 60plus, unknown)
    #[arg(long, value_name = "BAND")]
    age_band: Option<AgeBand>,

    /// Keep only check-ins at this activation
    #[arg(long, value_name = "ID")]
    activation: Option<EntityId>,

    /// Date ages are computed on (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    as_of: Option<NaiveDate>,

    /// Offset from UTC in minutes for day and hour buckets
    #[arg(long, value_name = "MINUTES", allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every dashboard series
    Dashboard {
        /// Restrict the hourly chart to one day
        #[arg(long, value_name = "YYYY-MM-DD")]
        day: Option<NaiveDate>,
    },
    /// Headline metrics
    Metrics,
    /// Check-ins per published activation
    Activations {
        /// Show only the N busiest activations
        #[arg(long, value_name = "N")]
        top: Option<usize>,
    },
    /// Check-ins per day
    Days,
    /// Check-ins per hour of day
    Hours {
        #[arg(long, value_name = "YYYY-MM-DD")]
        day: Option<NaiveDate>,
    },
    /// Redemptions per prize
    Prizes,
    /// Registered users versus check-ins
    Funnel,
    /// Share of check-ins kept by the filter
    FilterStats,
    /// Profile of one user (unfiltered)
    User { id: EntityId },
    /// Statistics of one activation (unfiltered)
    Activation { id: EntityId },
    /// Statistics of one event (unfiltered)
    Event { id: EntityId },
    /// Distinct values of a field, for building selectors
    Values {
        /// Table name as it appears in the snapshot document
        table: String,
        field: String,
    },
    /// The filtered snapshot, in the loader document shape
    Dump,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Engagement Insights CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using engagement-core v{}", engagement_core::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let snapshot = load_snapshot(&args.snapshot)?;
    let stats = snapshot.stats();
    log::info!(
        "Snapshot: {} records, {} links ({} users, {} check-ins)",
        stats.num_records,
        stats.num_links,
        stats.num_users,
        stats.num_checkins
    );

    run(&args, &app_config, &snapshot)
}

/// Read the snapshot document from a file, or stdin for "-"
fn load_snapshot(path: &Path) -> Result<Snapshot> {
    if path == Path::new("-") {
        log::info!("Loading snapshot from stdin");
        return Snapshot::from_reader(io::stdin().lock())
            .context("Failed to load snapshot from stdin");
    }
    Snapshot::from_path(path).with_context(|| format!("Failed to load snapshot: {:?}", path))
}

/// Filter state from config, with each flag overriding its key
fn resolve_filter(args: &Args, app_config: &AppConfig) -> FilterState {
    let base = app_config.filter;
    base.with_has_account(args.has_account.or(base.has_account))
        .with_age_band(args.age_band.or(base.age_band))
        .with_selected_activation(args.activation.or(base.selected_activation))
}

/// Engine configuration from config, with flags taking precedence
fn resolve_engine(args: &Args, app_config: &AppConfig) -> EngineConfig {
    let mut engine = app_config.engine.clone();
    if let Some(minutes) = args.utc_offset {
        engine = engine.with_utc_offset_minutes(minutes);
    }
    if let Some(as_of) = args.as_of {
        engine = engine.with_as_of(as_of);
    }
    engine
}

fn run(args: &Args, app_config: &AppConfig, snapshot: &Snapshot) -> Result<()> {
    let format = args.format.unwrap_or(app_config.output.format);
    let engine = resolve_engine(args, app_config);
    let filter = resolve_filter(args, app_config);
    let as_of = engine.as_of_or(chrono::Local::now().date_naive());

    log::debug!(
        "Filter: {} active predicate(s), ages as of {}",
        filter.active_count(),
        as_of
    );

    let view = filter_view(snapshot, &filter, as_of);
    let analytics = Analytics::new(&view, &engine);
    let relations = Relations::new(snapshot);
    let mut out = io::stdout().lock();

    match &args.command {
        Command::Dashboard { day } => emit(&analytics.dashboard(*day), format, &mut out),
        Command::Metrics => emit(&analytics.metrics(), format, &mut out),
        Command::Activations { top } => {
            let series = match top {
                Some(n) => analytics.top_activations(*n),
                None => analytics.checkins_by_activation(),
            };
            emit(&series, format, &mut out)
        }
        Command::Days => emit(&analytics.checkins_by_day(), format, &mut out),
        Command::Hours { day } => emit(&analytics.hourly_peaks(*day), format, &mut out),
        Command::Prizes => emit(&analytics.redemptions_by_prize(), format, &mut out),
        Command::Funnel => emit(&analytics.funnel(), format, &mut out),
        Command::FilterStats => emit(&analytics.filter_stats(), format, &mut out),
        Command::User { id } => {
            let profile = relations
                .user_profile(*id)
                .ok_or_else(|| anyhow!("No user with id {}", id))?;
            emit(&profile, format, &mut out)
        }
        Command::Activation { id } => {
            let stats = relations
                .activation_stats(*id)
                .ok_or_else(|| anyhow!("No activation with id {}", id))?;
            emit(&stats, format, &mut out)
        }
        Command::Event { id } => {
            let stats = relations
                .event_stats(*id)
                .ok_or_else(|| anyhow!("No event with id {}", id))?;
            emit(&stats, format, &mut out)
        }
        Command::Values { table, field } => {
            let kind = EntityKind::from_table_name(table)
                .ok_or_else(|| anyhow!("Unknown table: {}", table))?;
            emit(&snapshot.distinct_values(kind, field), format, &mut out)
        }
        Command::Dump => emit(&view.materialize(), format, &mut out),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
