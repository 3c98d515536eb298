//! quiz-supply - generate, validate, and serve exam questions

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_agent::{AcquisitionGateway, GatewayConfig, OpenAiBackend};
use quiz_bank::ItemStore;
use quiz_supply::{
    cli::{Args, Command},
    SeenSet, SupplyController,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr; stdout carries the JSON output
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "quiz_supply={0},quiz_agent={0},quiz_bank={0},warn",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.load_config()?;
    let store = Arc::new(ItemStore::open(&config.store.path).await?);
    info!(path = %config.store.path, items = store.len().await, "Store opened");

    let backend = OpenAiBackend::new(args.base_url.clone(), args.model.clone(), args.api_key()?)?;
    let gateway = Arc::new(
        AcquisitionGateway::new(Arc::new(backend))
            .with_config(GatewayConfig::from(&config.generator)),
    );
    let controller = SupplyController::with_config(gateway, store.clone(), config.clone());

    match args.command {
        Command::Initial { category, wait } => {
            let mut initial = controller.request_initial(category).await?;
            print_json(&initial)?;

            if wait {
                if let Some(backfill) = initial.backfill.take() {
                    backfill.join().await;
                }
                let mut seen = SeenSet::new();
                seen.mark(&initial.item);
                print_json(&controller.collect(category, &seen))?;
            }
        }
        Command::Batch { category, count } => {
            let count = count.unwrap_or(config.acquisition.default_batch_size);
            let outcome = controller.request_batch(category, count).await?;
            if let Some(reason) = &outcome.interrupted {
                warn!(category = %category, error = %reason, "Batch interrupted");
            }
            print_json(&outcome)?;
        }
        Command::Random { category } => match controller.random_from_store(category).await {
            Some(item) => print_json(&item)?,
            None => anyhow::bail!("No stored items available for {}", category),
        },
        Command::Stats => print_json(&store.counts().await)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
