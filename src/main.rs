// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use checkin_desk::{
    open_store, read_roster_csv, write_export_csv, CheckInEngine, CheckInOutcome, CheckInRequest,
    Config,
};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "checkin-desk", version = checkin_desk::VERSION)]
#[command(about = "Event check-in desk", long_about = None)]
struct Cli {
    /// Store path (overrides CHECKIN_DB). `.json` selects the flat file store.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the roster with the rows of a CSV file
    Import { csv: PathBuf },

    /// Write the check-in sheet to a CSV file
    Export { csv: PathBuf },

    /// Print all records, latest check-in first
    List,

    /// Print desk counters
    Stats,

    /// Check in one attendee
    Checkin {
        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: String,

        /// This is a new person even if the roster has look-alikes
        #[arg(long, default_value_t = false)]
        confirm_new: bool,

        /// Claim the roster entry with this phone
        #[arg(long)]
        use_phone: Option<String>,
    },

    /// Live board (press 'q' to quit)
    Board {
        /// Seconds between store refreshes
        #[arg(long, default_value_t = 2)]
        refresh: u64,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = open_store(&config.db_path)
        .with_context(|| format!("Failed to open store {}", config.db_path.display()))?;
    let engine = CheckInEngine::new(store);

    match cli.cmd {
        Commands::Import { csv } => run_import(&engine, &csv)?,
        Commands::Export { csv } => run_export(&engine, &csv)?,
        Commands::List => run_list(&engine)?,
        Commands::Stats => println!("📊 {}", engine.stats()?.summary()),
        Commands::Checkin {
            name,
            phone,
            confirm_new,
            use_phone,
        } => {
            let req = CheckInRequest {
                name,
                phone,
                confirm_new,
                use_existing_phone: use_phone,
            };
            run_checkin(&engine, &req)?;
        }
        Commands::Board { refresh } => run_board(engine, refresh)?,
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

fn run_import(engine: &CheckInEngine, csv: &Path) -> Result<()> {
    println!("📂 Loading roster from {}", csv.display());

    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let rows = read_roster_csv(file)?;
    let count = engine.import_roster(rows)?;

    println!("✓ Imported {} attendees (store replaced)", count);
    Ok(())
}

fn run_export(engine: &CheckInEngine, csv: &Path) -> Result<()> {
    let rows = engine.export_roster()?;
    let file = File::create(csv).with_context(|| format!("Failed to create {}", csv.display()))?;
    write_export_csv(file, &rows)?;

    println!("✓ Exported {} rows to {}", rows.len(), csv.display());
    Ok(())
}

fn run_list(engine: &CheckInEngine) -> Result<()> {
    let records = engine.list_records()?;

    for rec in &records {
        let time = rec
            .check_in_time
            .map(checkin_desk::roster::format_local_time)
            .unwrap_or_default();
        let marker = if rec.is_walk_in() { " (walk-in)" } else { "" };
        println!(
            "{:<20} {:<15} {:<8} {}{}",
            rec.name,
            checkin_desk::mask_phone(&rec.phone),
            rec.status.label(),
            time,
            marker
        );
    }

    println!("\n{} records", records.len());
    Ok(())
}

fn run_checkin(engine: &CheckInEngine, req: &CheckInRequest) -> Result<()> {
    let outcome = engine.check_in(req)?;

    match &outcome {
        CheckInOutcome::Success { .. } => println!("✅ {}", outcome.message()),
        CheckInOutcome::AlreadyCheckedIn { .. } => println!("⚠️  {}", outcome.message()),
        CheckInOutcome::RequiresConfirmation { candidates } => {
            println!("❓ {}", outcome.message());
            for c in candidates {
                println!("   {:<20} {:<15} [{}]", c.name, c.masked_phone, c.match_type.label());
            }
            println!("\n   Re-run with --use-phone <phone> to claim one, or --confirm-new");
        }
        CheckInOutcome::ValidationError { reason } => {
            eprintln!("❌ {}", reason);
            std::process::exit(2);
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_board(engine: CheckInEngine, refresh: u64) -> Result<()> {
    let mut app = ui::App::new(engine, std::time::Duration::from_secs(refresh.max(1)));
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_board(_engine: CheckInEngine, _refresh: u64) -> Result<()> {
    eprintln!("❌ Live board not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
