//! LedgerLake CLI: read ledgers, transactions and events from a data-lake archive.
//!
//! # Commands
//! ```text
//! ledgerlake schema
//! ledgerlake locate       <LEDGER>
//! ledgerlake ledger       <LEDGER>
//! ledgerlake transactions --start <N> --end <N> [--source G…] [--contract C…] [--op-type …] [--include-failed]
//! ledgerlake events       --start <N> --end <N> [--contract C…] [--kind …] [--topic sym:transfer]
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use ledgerlake_core::meta::{ContractEventType, OperationType, ScVal};
use ledgerlake_core::{ArchiveConfig, LedgerLake};

mod cmd_query;
mod logging;

#[derive(Parser)]
#[command(
    name = "ledgerlake",
    about = "Query ledger data-lake archives",
    long_about = "
LedgerLake CLI: locate, download and decode ledger batches from a
data-lake archive and stream the transactions and events they contain.

ENVIRONMENT VARIABLES:
  LEDGERLAKE_URL   Archive base URL (must end with '/')
  RUST_LOG         Log filter, overrides --log-level
",
    version
)]
struct Cli {
    #[command(flatten)]
    archive: ArchiveArgs,

    /// Log level for stderr diagnostics
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ArchiveArgs {
    /// Archive base URL, e.g. https://lake.example.org/ledgers/pubnet/
    #[arg(long, env = "LEDGERLAKE_URL", global = true)]
    url: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, default_value_t = 60_000)]
    timeout_ms: u64,

    /// Retries after the first failed download attempt
    #[arg(long, global = true, default_value_t = 3)]
    max_retries: u32,

    /// Maximum simultaneous batch downloads
    #[arg(long, global = true, default_value_t = 10)]
    concurrency: usize,

    /// Decompressed batches kept in memory
    #[arg(long, global = true, default_value_t = 32)]
    cache_capacity: usize,
}

impl ArchiveArgs {
    fn config(&self) -> Result<ArchiveConfig> {
        let url = self
            .url
            .clone()
            .context("archive URL required: pass --url or set LEDGERLAKE_URL")?;
        let config = ArchiveConfig::builder(url)
            .request_timeout(Duration::from_millis(self.timeout_ms))
            .max_retries(self.max_retries)
            .max_concurrent_downloads(self.concurrency)
            .cache_capacity(self.cache_capacity)
            .build()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the archive layout published in .config.json
    Schema,

    /// Print the object URL of the batch holding a ledger
    Locate {
        ledger: u32,
    },

    /// Fetch one ledger and list its transactions
    Ledger {
        ledger: u32,
    },

    /// Stream transactions in a ledger range
    Transactions {
        #[command(flatten)]
        range: RangeArgs,
        /// Only transactions from this source account
        #[arg(long)]
        source: Option<String>,
        /// Only transactions invoking this contract
        #[arg(long)]
        contract: Option<String>,
        /// Only transactions containing one of these operation types
        #[arg(long = "op-type")]
        op_types: Vec<OperationType>,
        /// Include failed transactions
        #[arg(long)]
        include_failed: bool,
    },

    /// Stream contract events in a ledger range
    Events {
        #[command(flatten)]
        range: RangeArgs,
        /// Only events from these contracts
        #[arg(long = "contract")]
        contracts: Vec<String>,
        /// Only these kinds: contract, system, diagnostic
        #[arg(long = "kind")]
        kinds: Vec<ContractEventType>,
        /// Match events carrying any of these topics, e.g. sym:transfer
        #[arg(long = "topic")]
        topics: Vec<ScVal>,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// First ledger (inclusive)
    #[arg(long)]
    start: u32,
    /// Last ledger (inclusive)
    #[arg(long)]
    end: u32,
    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&logging::LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let lake = ledgerlake_http::connect(cli.archive.config()?)
        .context("failed to create archive client")?;
    let result = run(&lake, cli.command, cli.json).await;
    lake.close();
    result
}

async fn run(lake: &LedgerLake, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Schema => cmd_schema(lake, json).await,
        Commands::Locate { ledger } => cmd_locate(lake, ledger).await,
        Commands::Ledger { ledger } => cmd_query::ledger(lake, ledger, json).await,
        Commands::Transactions {
            range,
            source,
            contract,
            op_types,
            include_failed,
        } => {
            let filter = ledgerlake_core::TransactionFilter {
                source_account: source,
                contract_id: contract,
                operation_types: op_types,
                include_failed,
            };
            cmd_query::transactions(lake, range.start..=range.end, filter, range.limit, json).await
        }
        Commands::Events {
            range,
            contracts,
            kinds,
            topics,
        } => {
            let filter = ledgerlake_core::EventFilter {
                contract_ids: contracts,
                kinds,
                topics,
            };
            cmd_query::events(lake, range.start..=range.end, filter, range.limit, json).await
        }
    }
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_schema(lake: &LedgerLake, json: bool) -> Result<()> {
    let schema = lake.schema().await.context("failed to resolve archive schema")?;
    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
    } else {
        println!("Network:               {}", schema.network_passphrase);
        println!("Version:               {}", schema.version);
        println!("Compression:           {}", schema.compression);
        println!("Ledgers per batch:     {}", schema.ledgers_per_batch);
        println!("Batches per partition: {}", schema.batches_per_partition);
        println!("Partition size:        {}", schema.partition_size());
    }
    Ok(())
}

async fn cmd_locate(lake: &LedgerLake, ledger: u32) -> Result<()> {
    let url = lake
        .batch_url(ledger)
        .await
        .with_context(|| format!("failed to locate ledger {ledger}"))?;
    println!("{url}");
    Ok(())
}
