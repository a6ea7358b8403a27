use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use hhg_pricing::carrier::CarrierSelector;
use hhg_pricing::config::PricingConfig;
use hhg_pricing::dataset::{load_reference, Dataset};
use hhg_pricing::logging::init_logging;
use hhg_pricing::models::ShipmentId;
use hhg_pricing::pricing::CostCalculator;
use hhg_pricing::quote::{quote_base_charges, QuoteRequest};
use hhg_pricing::rates::RateLookup;
use hhg_pricing::routing::FixedDistancePlanner;
use hhg_pricing::services::Recalculator;
use hhg_pricing::store::RecordStore;
use hhg_pricing::unit::{DiscountRate, Pound};

/// Price household goods shipments against tariff reference data
#[derive(Parser)]
#[command(name = "hhg-pricing")]
#[command(about = "HHG relocation pricing and carrier selection", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price every base charge for a hypothetical shipment
    VerifyRates {
        /// Reference data JSON (bare or inside a dataset)
        #[arg(long)]
        reference: PathBuf,

        #[arg(long)]
        origin_zip: String,

        #[arg(long)]
        destination_zip: String,

        /// Net weight in pounds
        #[arg(long)]
        weight: i64,

        #[arg(long)]
        book_date: NaiveDate,

        #[arg(long)]
        pickup_date: NaiveDate,

        #[arg(long)]
        miles: u32,

        /// Select the carrier discount from this dataset's performances
        #[arg(long, conflicts_with = "discount")]
        dataset: Option<PathBuf>,

        /// Discount multiplier to apply (default: none)
        #[arg(long)]
        discount: Option<Decimal>,
    },
    /// Recalculate a shipment in a dataset and print the report as JSON
    Recalculate {
        /// Dataset JSON with reference data and records
        #[arg(long)]
        dataset: PathBuf,

        #[arg(long)]
        shipment: ShipmentId,

        /// Distance the planner reports for the shipment
        #[arg(long)]
        miles: u32,

        /// Mark the shipment delivered on this date first
        #[arg(long)]
        deliver: Option<NaiveDate>,

        /// Write the updated records here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match PricingConfig::load(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level, cli.verbose);

    let result = match cli.command {
        Commands::VerifyRates {
            reference,
            origin_zip,
            destination_zip,
            weight,
            book_date,
            pickup_date,
            miles,
            dataset,
            discount,
        } => {
            let request = QuoteRequest {
                origin_zip,
                destination_zip,
                weight: Pound(weight),
                book_date,
                pickup_date,
                miles,
            };
            run_verify_rates(&config, reference, request, dataset, discount).await
        }
        Commands::Recalculate {
            dataset,
            shipment,
            miles,
            deliver,
            output,
        } => run_recalculate(&config, dataset, shipment, miles, deliver, output).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_verify_rates(
    config: &PricingConfig,
    reference: PathBuf,
    request: QuoteRequest,
    dataset: Option<PathBuf>,
    discount: Option<Decimal>,
) -> anyhow::Result<()> {
    let rates: Arc<dyn RateLookup> = Arc::new(load_reference(&reference).await?);
    let calculator = CostCalculator::new(rates.clone()).with_linehaul_code(&config.linehaul_code);

    let discount = match (dataset, discount) {
        (Some(path), _) => {
            let (_, store) = Dataset::load(&path).await?.into_parts()?;
            let selector =
                CarrierSelector::new(rates.clone()).with_code_of_service(&config.code_of_service);
            let key = selector.grouping_key_for(&request.shipment())?;
            let tx = store.begin().await?;
            let performance = selector
                .select_carrier_performance(
                    tx.as_ref(),
                    &key,
                    request.book_date,
                    request.pickup_date,
                )
                .await?;
            info!(
                grouping = %key,
                performance_id = %performance.id,
                discount = %performance.linehaul_rate,
                "Selected carrier performance"
            );
            performance.linehaul_rate
        }
        (None, Some(rate)) => DiscountRate::new(rate)?,
        (None, None) => DiscountRate::NONE,
    };

    let quote = quote_base_charges(&calculator, &request, discount)?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn run_recalculate(
    config: &PricingConfig,
    dataset: PathBuf,
    shipment_id: ShipmentId,
    miles: u32,
    deliver: Option<NaiveDate>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (rates, store) = Dataset::load(&dataset).await?.into_parts()?;
    let rates: Arc<dyn RateLookup> = rates;
    let store = Arc::new(store);

    let recalculator = Recalculator::new(
        store.clone(),
        CostCalculator::new(rates.clone()).with_linehaul_code(&config.linehaul_code),
        CarrierSelector::new(rates).with_code_of_service(&config.code_of_service),
        Arc::new(FixedDistancePlanner::new(miles)),
        config.distance_timeout,
    );

    let report = match deliver {
        Some(date) => recalculator.deliver_and_price(&shipment_id, date).await?,
        None => recalculator.recalculate_shipment(&shipment_id).await?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = output {
        let mut updated = Dataset::load(&dataset).await?;
        updated.records = store.snapshot().await;
        let json = serde_json::to_string_pretty(&updated)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote updated records to {}", path.display());
    }
    Ok(())
}
