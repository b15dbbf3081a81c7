use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info};
use tokio::task::JoinHandle;

use rusty_arb::modules::blocks_updater::BlocksUpdater;
use rusty_arb::modules::bundler::Bundler;
use rusty_arb::modules::config::Config;
use rusty_arb::modules::opportunity_finder::OpportunityFinder;
use rusty_arb::modules::relay::FlashbotsRelay;
use rusty_arb::modules::transaction_executor::TransactionExecutor;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let priv_key = std::env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set");
    let ws_url = std::env::var("WS_PROVIDER").expect("WS_PROVIDER must be set");

    info!("Connecting to WebSocket provider: {}", ws_url);

    let config = Arc::new(
        Config::new(ws_url, priv_key)
            .await
            .expect("Failed to build config"),
    );

    let bundler = Bundler::new(
        config.provider.clone(),
        config.sender.clone(),
        config.bot_address,
        config.chain_id,
    );
    let relay = Arc::new(FlashbotsRelay::new(
        config.relay_url.clone(),
        config.relay_signer.clone(),
        config.provider.clone(),
    ));

    let updater = BlocksUpdater::new(config.clone());
    let mut finder = OpportunityFinder::new(config.clone());
    let mut executor = TransactionExecutor::new(config.clone(), bundler, relay);

    let updater_handle: JoinHandle<()> = tokio::spawn(async move {
        if let Err(e) = updater.run().await {
            error!("Blocks updater stopped: {}", e);
        }
    });
    let finder_handle: JoinHandle<()> = tokio::spawn(async move { finder.run().await });
    let executor_handle: JoinHandle<()> = tokio::spawn(async move { executor.run().await });

    tokio::try_join!(updater_handle, finder_handle, executor_handle)
        .expect("One of the tasks failed");
}
