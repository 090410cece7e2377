use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vendomat::application::machine::VendingMachine;
use vendomat::config::MachineConfig;
use vendomat::domain::drink::default_catalog;
use vendomat::infrastructure::in_memory::InMemoryLedger;
use vendomat::interfaces::console::{ConsoleSink, write_snapshot_json};
use vendomat::interfaces::csv::catalog_reader::read_catalog;
use vendomat::interfaces::csv::event_reader::EventReader;
use vendomat::interfaces::csv::inventory_writer::InventoryWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(author, version, about = "Replays customer events against a vending machine", long_about = None)]
struct Cli {
    /// Event script CSV file (`action, value` rows)
    script: PathBuf,

    /// Drink catalog CSV file (`name, price, stock, image`). Defaults to the built-in catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Report format for the final inventory
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Length of a card session in seconds
    #[arg(long)]
    card_session_secs: Option<u32>,

    /// Simulated card charge round trip in milliseconds
    #[arg(long)]
    charge_delay_ms: Option<u64>,

    /// Pause between a settled card charge and the reset, in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Pause before resetting after a refund or exact-change sale, in milliseconds
    #[arg(long)]
    reset_delay_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let catalog = match &cli.catalog {
        Some(path) => read_catalog(File::open(path).into_diagnostic()?).into_diagnostic()?,
        None => default_catalog(),
    };
    let ledger = InMemoryLedger::new(catalog).into_diagnostic()?;
    let config = MachineConfig::from_cli(
        cli.card_session_secs,
        cli.charge_delay_ms,
        cli.settle_delay_ms,
        cli.reset_delay_ms,
    );
    let machine = VendingMachine::new(config, Box::new(ledger), Box::new(ConsoleSink));
    tracing::info!(
        card_session_secs = machine.config().card_session_secs,
        "machine ready"
    );

    let file = File::open(&cli.script).into_diagnostic()?;
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                match machine.apply(event).await {
                    Ok(()) => {}
                    Err(e) if e.is_rejection() => eprintln!("Rejected: {}", e),
                    Err(e) => return Err(e).into_diagnostic(),
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    let snapshot = machine.snapshot().await.into_diagnostic()?;
    let stdout = io::stdout();
    match cli.format {
        OutputFormat::Csv => InventoryWriter::new(stdout.lock())
            .write_drinks(&snapshot.drinks)
            .into_diagnostic()?,
        OutputFormat::Json => write_snapshot_json(stdout.lock(), &snapshot).into_diagnostic()?,
    }

    Ok(())
}
