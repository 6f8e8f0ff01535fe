//! Command-line entry point: bootstrap the counter if needed, then increment it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use counter_client::{
    load_identity, load_or_create_resource_identity, ClientConfig, ClientError, CounterLifecycle,
    RpcLedgerClient,
};
use tracing_subscriber::EnvFilter;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Parser)]
#[command(name = "counter-client")]
#[command(about = "Initialize a counter account if needed, then increment it")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "COUNTER_CLIENT_CONFIG")]
    config: Option<PathBuf>,
    /// JSON-RPC endpoint
    #[arg(long, short = 'u')]
    url: Option<String>,
    /// Fee payer keypair file
    #[arg(long, short = 'k')]
    keypair: Option<PathBuf>,
    /// Counter keypair file, created on first run
    #[arg(long)]
    counter_keypair: Option<PathBuf>,
    /// Counter program id
    #[arg(long)]
    program_id: Option<String>,
    /// processed, confirmed or finalized
    #[arg(long)]
    commitment: Option<String>,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> Result<ClientConfig, ClientError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        if let Some(url) = self.url {
            config.rpc_url = url;
        }
        if let Some(keypair) = self.keypair {
            config.payer_keypair = keypair;
        }
        if let Some(counter_keypair) = self.counter_keypair {
            config.counter_keypair = counter_keypair;
        }
        if let Some(program_id) = self.program_id {
            config.program_id = program_id;
        }
        if let Some(commitment) = self.commitment {
            config.commitment = commitment;
        }
        Ok(config)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(config: ClientConfig) -> Result<(), ClientError> {
    let program_id = config.program_id()?;
    let ledger = RpcLedgerClient::new(
        config.rpc_url.clone(),
        config.commitment()?,
        program_id,
        config.confirmation_policy()?,
    );

    let payer = load_identity(&config.payer_keypair)?;
    println!("Using account: {}", payer.address());

    let counter = load_or_create_resource_identity(&config.counter_keypair)?;
    println!("Counter account: {}", counter.address());

    let mut lifecycle = CounterLifecycle::new(&ledger, program_id, &payer, &counter);
    let result = lifecycle.run().await;

    // The balance is read before any transaction; show it even if a later step failed.
    if let Some(lamports) = lifecycle.payer_balance() {
        println!("Account balance: {} SOL", lamports as f64 / LAMPORTS_PER_SOL);
    }
    let report = result?;

    if let Some(signature) = report.initialize_signature {
        println!("Initialize signature: {signature}");
    }
    if report.initialized_by_this_run {
        println!("Counter initialized. Current count: {}", report.before_increment.count);
    } else {
        println!("Counter found. Current count: {}", report.before_increment.count);
    }
    println!("Increment signature: {}", report.increment_signature);
    println!("Counter incremented. New count: {}", report.after_increment.count);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = match cli.into_config() {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ ClientError::RemoteProgram { translated: None, .. }) => {
            eprintln!("Unknown error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
