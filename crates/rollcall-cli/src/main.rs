use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::Embedding;
use rollcall_kiosk::{Config, Kiosk, MarkEvent};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance kiosk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new identity from a captured embedding
    Register {
        /// Display name for the identity
        #[arg(short, long)]
        name: String,
        /// JSON embedding file produced by the recognition model
        embedding: PathBuf,
    },
    /// Mark attendance (IN on first mark of the day, OUT on the second)
    Mark {
        /// JSON embedding file produced by the recognition model
        embedding: PathBuf,
    },
    /// List registered identities and attendance records
    View,
    /// Delete all identities and attendance records
    Clear {
        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Show database location and counts
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let mut kiosk = Kiosk::open(&config)?;

    match cli.command {
        Commands::Register { name, embedding } => {
            let embedding = load_embedding(&embedding)?;
            let reg = kiosk.register_embedding(&name, &embedding)?;
            println!("{} registered successfully (id {})", reg.name, reg.id);
        }
        Commands::Mark { embedding } => {
            let embedding = load_embedding(&embedding)?;
            let report = kiosk.mark_attendance_embedding(&embedding)?;
            match report.event {
                MarkEvent::In(time) => {
                    println!("Attendance marked for {} as IN at {}", report.name, time);
                }
                MarkEvent::Out(time) => {
                    println!("Attendance marked for {} as OUT at {}", report.name, time);
                }
                MarkEvent::AlreadyRecorded => {
                    println!(
                        "Attendance already recorded for {} today ({})",
                        report.name, report.date
                    );
                }
            }
        }
        Commands::View => {
            println!("Registered identities:");
            let identities = kiosk.registered()?;
            if identities.is_empty() {
                println!("  (none)");
            }
            for (id, name) in identities {
                println!("  {id:>4}  {name}");
            }

            println!("\nAttendance records:");
            let records = kiosk.records()?;
            if records.is_empty() {
                println!("  (none)");
            }
            for record in records {
                let in_time = record
                    .in_time
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".into());
                let out_time = record
                    .out_time
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "  {:>4}  {}  {}  in {}  out {}",
                    record.identity_id, record.name, record.date, in_time, out_time
                );
            }
        }
        Commands::Clear { yes } => {
            if yes || confirm_clear()? {
                kiosk.clear()?;
                println!("Database cleared.");
            } else {
                println!("Operation cancelled.");
            }
        }
        Commands::Status => {
            let status = kiosk.status()?;
            println!("database:       {}", config.db_path.display());
            println!("identities:     {}", status.identities);
            println!("records today:  {} ({})", status.records_today, status.date);
        }
    }

    Ok(())
}

/// Read an embedding from a JSON array file, the payload the external
/// recognition model emits.
fn load_embedding(path: &Path) -> Result<Embedding> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read embedding file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON embedding array", path.display()))
}

/// Ask the operator to type `yes` before wiping the database.
fn confirm_clear() -> Result<bool> {
    print!("WARNING: this will delete ALL data. Type 'yes' to confirm: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}
