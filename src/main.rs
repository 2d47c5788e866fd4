use agricart::config::EngineConfig;
use agricart::domain::checkout::CustomerInfo;
use agricart::domain::ports::LocalStoreRef;
use agricart::infrastructure::in_memory::{InMemoryCatalog, InMemoryLocalStore};
use agricart::interfaces::csv::action_reader::ActionReader;
use agricart::interfaces::csv::cart_writer::CartWriter;
use agricart::interfaces::replay::Replayer;
use agricart::telemetry;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input shopper actions CSV file
    input: PathBuf,

    /// Product catalog (JSON array of product snapshots)
    #[arg(long)]
    catalog: PathBuf,

    /// Engine settings (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent local storage (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[arg(long, default_value = "Farm Shopper")]
    name: String,
    #[arg(long, default_value = "shopper@example.com")]
    email: String,
    #[arg(long, default_value = "1 Market Road")]
    address: String,
    #[arg(long, default_value = "Nashik")]
    city: String,
    #[arg(long, default_value = "Maharashtra")]
    state: String,
    #[arg(long, default_value = "422001")]
    postal_code: String,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn local_store(db_path: Option<PathBuf>) -> Result<LocalStoreRef> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        let store = agricart::infrastructure::rocksdb::RocksDbLocalStore::open(path)
            .into_diagnostic()?;
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    Ok(Arc::new(InMemoryLocalStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    let catalog = Arc::new(InMemoryCatalog::from_json_file(&cli.catalog).into_diagnostic()?);
    let local = local_store(cli.db_path)?;
    let customer = CustomerInfo {
        name: cli.name,
        email: cli.email,
        address: cli.address,
        city: cli.city,
        state: cli.state,
        postal_code: cli.postal_code,
    };

    let mut replayer = Replayer::in_memory(catalog, local, &config, customer)
        .await
        .into_diagnostic()?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = ActionReader::new(file);
    for action in reader.actions() {
        match action {
            Ok(action) => match replayer.apply(&action).await {
                Ok(notice) if !notice.is_empty() => eprintln!("{notice}"),
                Ok(_) => {}
                Err(e) => eprintln!("Error processing action: {}", e.user_message()),
            },
            Err(e) => eprintln!("Error reading action: {e}"),
        }
    }

    let stdout = io::stdout();
    let mut writer = CartWriter::new(stdout.lock());
    writer.write_cart(&replayer.cart()).into_diagnostic()?;

    Ok(())
}
