use std::sync::Arc;

use alloy::primitives::U256;
use log::{error, info, warn};

use crate::modules::bundler::Bundler;
use crate::modules::gas::{estimate_next_block_gas, fallback_gas};
use crate::modules::relay::{execute_bundle, BundleRelay, BundleStatus, SubmissionOutcome};
use crate::types::opportunity::Opportunity;

use super::config::Config;

/// Turns profitable opportunities into signed bundles and shepherds them
/// through the relay.
pub struct TransactionExecutor {
    config: Arc<Config>,
    bundler: Bundler,
    relay: Arc<dyn BundleRelay>,
}

impl TransactionExecutor {
    pub fn new(config: Arc<Config>, bundler: Bundler, relay: Arc<dyn BundleRelay>) -> Self {
        Self { config, bundler, relay }
    }

    pub async fn run(&mut self) {
        info!("Starting transaction executor");

        loop {
            let opportunity = match self.config.opportunity_receiver.lock().await.recv().await {
                Some(opportunity) => opportunity,
                None => break,
            };

            if let Err(e) = self.execute(opportunity).await {
                error!("Failed to execute opportunity: {}", e);
            }
        }
    }

    async fn execute(&self, opportunity: Opportunity) -> eyre::Result<()> {
        let block_number = *self.config.app_state.block_number.read().await;
        let next_base_fee = *self.config.app_state.next_block_base_fee.read().await;
        if block_number == 0 || next_base_fee == 0 {
            warn!("Skipping opportunity, no block state yet");
            return Ok(());
        }

        let gas = match estimate_next_block_gas(self.config.chain_id).await {
            Some(estimate) => estimate,
            None => fallback_gas(next_base_fee, self.config.default_priority_gwei),
        };

        let path = &self.config.paths[opportunity.path_index];
        let amount_in = U256::from(opportunity.optimal_amount_in)
            * U256::from(10).pow(U256::from(path.token_in_decimals()));
        let routers = vec![self.config.router; path.nhop()];
        let legs = path.swap_legs(&routers);

        let nonce = self.bundler.next_nonce().await?;
        let order = self.bundler.order_tx(
            nonce,
            &legs,
            amount_in,
            self.config.flashloan,
            self.config.loan_from,
            &gas,
        );
        let bundle = self.bundler.sign_bundle(vec![order]).await?;

        match execute_bundle(self.relay.as_ref(), &bundle, block_number).await? {
            SubmissionOutcome::SimulationReverted(reason) => {
                warn!("Opportunity on path #{} went stale: {}", opportunity.path_index, reason);
            }
            SubmissionOutcome::Submitted(pending) => match self.relay.wait(&pending).await {
                Ok(BundleStatus::Included) => {
                    info!(
                        "Bundle included in block {}, expected profit {}",
                        pending.target_block, opportunity.expected_profit
                    );
                }
                Ok(status) => {
                    info!("Bundle for block {} resolved as {:?}", pending.target_block, status);
                }
                Err(e) => {
                    warn!("Lost track of bundle, cancelling: {}", e);
                    match self.relay.cancel(&pending.replacement_id).await {
                        Ok(()) => info!("Bundle {} cancelled", pending.replacement_id),
                        Err(cancel_err) => warn!("Cancel failed too: {}", cancel_err),
                    }
                }
            },
        }

        Ok(())
    }
}
