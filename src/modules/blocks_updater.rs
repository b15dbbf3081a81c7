use std::sync::Arc;

use alloy::primitives::U256;
use alloy::providers::Provider;
use alloy::rpc::types::{Block, Filter};
use alloy::sol_types::SolEvent;
use eyre::Result;
use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

use crate::modules::gas::next_block_base_fee;
use crate::types::events::{BlockUpdate, ReserveEvent};
use crate::types::sync_event::Sync;

use super::config::Config;

/// Subscribes to new heads, predicts the next base fee and collects the
/// block's reserve updates for the finder.
pub struct BlocksUpdater {
    config: Arc<Config>,
}

impl BlocksUpdater {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting blocks updater");

        loop {
            let sub = self.config.provider.subscribe_blocks().await?;
            let mut block_stream = sub.into_stream();

            debug!("Starting block stream");
            while let Some(block) = block_stream.next().await {
                if let Err(e) = self.handle_block(block).await {
                    error!("Error handling block: {}", e);
                }
            }
            warn!("Block stream ended, resubscribing");
        }
    }

    async fn handle_block(&self, block: Block) -> Result<()> {
        let now = Instant::now();
        let block_number = block.header.number;
        debug!("Received new block: {}", block_number);

        let next_base_fee = next_block_base_fee(
            block.header.base_fee_per_gas.unwrap_or_default(),
            block.header.gas_used,
            block.header.gas_limit,
        );

        let mut lock = self.config.app_state.next_block_base_fee.write().await;
        *lock = next_base_fee;
        drop(lock);

        let mut lock = self.config.app_state.block_number.write().await;
        *lock = block_number;
        drop(lock);

        let events = self.fetch_reserve_events(block_number).await?;
        info!(
            "Block {}: {} sync events, next base fee {} in {} µs",
            block_number,
            events.len(),
            next_base_fee,
            now.elapsed().as_micros()
        );

        let update = BlockUpdate { block_number, next_base_fee, events };
        match self.config.block_update_sender.try_send(update) {
            Ok(_) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Finder is behind, dropping update for block {}", block_number);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(eyre::eyre!("Block update channel closed")),
        }
    }

    /// All `Sync` logs of the block, decoded into reserve events.
    async fn fetch_reserve_events(&self, block_number: u64) -> Result<Vec<ReserveEvent>> {
        let filter = Filter::new()
            .event_signature(Sync::SIGNATURE_HASH)
            .from_block(block_number)
            .to_block(block_number);
        let logs = self.config.provider.get_logs(&filter).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            let data = log.data().data.as_ref();
            if data.len() < 64 {
                continue;
            }
            events.push(ReserveEvent {
                pool: log.address(),
                reserve0: U256::from_be_slice(&data[0..32]),
                reserve1: U256::from_be_slice(&data[32..64]),
                tx_index: log.transaction_index.unwrap_or_default(),
            });
        }
        Ok(events)
    }
}
