use clap::Parser;
use harvestpay::application::scheduler::{PayoutScheduler, SweepConfig};
use harvestpay::domain::ports::{
    FarmerStore, FarmerStoreBox, LedgerStoreBox, PayoutStoreBox, PspGatewayBox, WalletStore,
    WalletStoreBox,
};
use harvestpay::infrastructure::in_memory::{
    InMemoryFarmerStore, InMemoryLedger, InMemoryPayoutStore, InMemoryWalletStore,
};
use harvestpay::infrastructure::onafriq::{OnafriqClient, OnafriqConfig};
use harvestpay::infrastructure::stub::StubPsp;
use harvestpay::interfaces::json::seed::SeedReader;
use harvestpay::error::PayoutError;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON seed file with wallets and farmers
    seed: PathBuf,

    /// Minimum wallet balance for payout eligibility
    #[arg(long, default_value = "50000")]
    threshold: Decimal,

    /// Delay between consecutive PSP calls, in milliseconds
    #[arg(long, default_value_t = 500)]
    pacing_ms: u64,

    /// Skip the live PSP and approve every payout locally
    #[arg(long)]
    dry_run: bool,

    /// Onafriq API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Onafriq API key
    #[arg(long)]
    api_key: Option<String>,

    /// Onafriq client id
    #[arg(long)]
    client_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let gateway: PspGatewayBox = if cli.dry_run {
        Box::new(StubPsp::new())
    } else {
        let base_url = cli
            .base_url
            .ok_or_else(|| PayoutError::ConfigError("--base-url is required without --dry-run".into()))
            .into_diagnostic()?;
        let api_key = cli
            .api_key
            .ok_or_else(|| PayoutError::ConfigError("--api-key is required without --dry-run".into()))
            .into_diagnostic()?;
        let client_id = cli
            .client_id
            .ok_or_else(|| PayoutError::ConfigError("--client-id is required without --dry-run".into()))
            .into_diagnostic()?;
        Box::new(OnafriqClient::new(OnafriqConfig::new(api_key, client_id, base_url)).into_diagnostic()?)
    };

    let wallet_store = InMemoryWalletStore::new();
    let farmer_store = InMemoryFarmerStore::new();

    let file = File::open(cli.seed).into_diagnostic()?;
    let seed = SeedReader::new(file).read().into_diagnostic()?;
    for farmer in seed.farmers {
        farmer_store.store(farmer).await.into_diagnostic()?;
    }
    for wallet in seed.wallets {
        wallet_store.store(wallet).await.into_diagnostic()?;
    }

    let wallets: WalletStoreBox = Box::new(wallet_store);
    let farmers: FarmerStoreBox = Box::new(farmer_store);
    let payouts: PayoutStoreBox = Box::new(InMemoryPayoutStore::new());
    let ledger: LedgerStoreBox = Box::new(InMemoryLedger::new());

    let scheduler = PayoutScheduler::new(
        wallets,
        farmers,
        payouts,
        ledger,
        gateway,
        SweepConfig {
            min_payout_threshold: cli.threshold,
            pacing: Duration::from_millis(cli.pacing_ms),
        },
    );

    let summary = scheduler.sweep().await.into_diagnostic()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).into_diagnostic()?
    );

    Ok(())
}
