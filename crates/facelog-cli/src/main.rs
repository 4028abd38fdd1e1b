use anyhow::Result;
use clap::{Parser, Subcommand};
use facelog_hw::Camera;
use facelog_store::IdentityStore;

mod config;
mod input;
mod monitor;
mod register;

use config::Config;

#[derive(Parser)]
#[command(name = "facelog", about = "Face-recognition attendance logger")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new face from the webcam
    Register,
    /// Run the attendance monitoring loop
    Monitor,
    /// List registered identities
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show recent attendance records
    Log {
        /// Maximum number of records to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Run camera diagnostics
    CameraTest,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Register => register::run(&config)?,
        Commands::Monitor => monitor::run(&config)?,
        Commands::List { json } => list_identities(&config, json)?,
        Commands::Log { limit, json } => show_log(&config, limit, json)?,
        Commands::CameraTest => camera_test(&config)?,
    }

    Ok(())
}

fn list_identities(config: &Config, json: bool) -> Result<()> {
    let store = IdentityStore::open(&config.db_path)?;
    let known = store.load_all()?;

    if json {
        let rows: Vec<_> = known
            .iter()
            .map(|k| serde_json::json!({ "id": k.id, "name": k.name, "dim": k.embedding.dim() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if known.is_empty() {
        println!("No identities registered.");
    } else {
        for k in &known {
            println!("{:>4}  {}", k.id, k.name);
        }
    }
    Ok(())
}

fn show_log(config: &Config, limit: usize, json: bool) -> Result<()> {
    let store = IdentityStore::open(&config.db_path)?;
    let records = store.attendance_log(limit)?;

    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "identity_id": r.identity_id,
                    "name": r.name,
                    "event": r.event,
                    "timestamp": r.timestamp,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if records.is_empty() {
        println!("No attendance records.");
    } else {
        for r in &records {
            println!("{}  {:<8}  {}", r.timestamp, r.event, r.name);
        }
    }
    Ok(())
}

fn camera_test(config: &Config) -> Result<()> {
    println!("Opening {}...", config.camera_device);
    let camera = Camera::open(&config.camera_device)?;
    println!(
        "Negotiated {}x{} ({:?})",
        camera.width, camera.height, camera.fourcc
    );

    let frame = camera.capture_frame()?;
    println!(
        "Captured frame #{}: {} bytes, avg brightness {:.1}",
        frame.sequence,
        frame.data.len(),
        frame.avg_brightness()
    );
    Ok(())
}
