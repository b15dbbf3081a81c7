use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use log::{debug, info, warn};
use rayon::prelude::*;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

use crate::modules::amm::u256_to_f64;
use crate::modules::evaluator::{optimize_amount_in, simulate_path};
use crate::modules::reserve_tracker::ReserveTracker;
use crate::types::opportunity::Opportunity;
use crate::types::path::ArbPath;

use super::config::Config;

/// Indexes of the paths that cross at least one touched pool. Only these
/// are worth re-evaluating after a block.
pub fn touched_path_indexes(paths: &[ArbPath], touched: &HashSet<Address>) -> Vec<usize> {
    paths
        .iter()
        .enumerate()
        .filter(|(_, path)| touched.iter().any(|pool| path.has_pool(pool)))
        .map(|(index, _)| index)
        .collect()
}

/// Evaluates the given paths against a reserve snapshot and returns the
/// profitable ones, best first.
///
/// Each path is first probed with a single whole unit of the base token.
/// Paths whose spread is not positive are discarded without running the
/// optimizer. A positive spread can still yield nothing: when the step
/// size overshoots a thin spread, the optimizer settles at zero profit
/// and the path is dropped rather than forwarded as a zero-value order.
pub fn scan_paths(
    paths: &[ArbPath],
    indexes: &[usize],
    reserves: &HashMap<Address, (U256, U256)>,
    max_amount_in: u64,
    step_size: u64,
) -> Vec<Opportunity> {
    let mut opportunities: Vec<Opportunity> = indexes
        .par_iter()
        .filter_map(|&index| {
            let path = &paths[index];
            let decimals = path.token_in_decimals();
            let unit = 10f64.powi(decimals as i32);

            let probe_out = simulate_path(path, 1, reserves)?;
            let spread_percent = (u256_to_f64(probe_out) / unit - 1.0) * 100.0;
            if spread_percent <= 0.0 {
                return None;
            }

            let (optimal_amount_in, expected_profit) =
                optimize_amount_in(path, max_amount_in, step_size, reserves)?;
            if expected_profit.is_negative() || expected_profit.is_zero() {
                return None;
            }

            Some(Opportunity {
                path_index: index,
                optimal_amount_in,
                expected_profit,
                spread_percent,
            })
        })
        .collect();

    opportunities.sort_by(|a, b| b.expected_profit.cmp(&a.expected_profit));
    opportunities
}

pub struct OpportunityFinder {
    config: Arc<Config>,
    tracker: ReserveTracker,
}

impl OpportunityFinder {
    pub fn new(config: Arc<Config>) -> Self {
        let tracked: HashSet<Address> = config.pools.iter().map(|pool| pool.address).collect();
        let tracker = ReserveTracker::new(tracked, HashMap::new());
        Self { config, tracker }
    }

    pub async fn run(&mut self) {
        info!("Starting opportunity finder over {} paths", self.config.paths.len());

        loop {
            let update = match self.config.block_update_receiver.lock().await.recv().await {
                Some(update) => update,
                None => break,
            };

            let now = Instant::now();
            let touched: HashSet<Address> =
                self.tracker.apply_block(&update.events).into_iter().collect();
            if touched.is_empty() {
                debug!("Block {} touched no tracked pools", update.block_number);
                continue;
            }

            let indexes = touched_path_indexes(&self.config.paths, &touched);
            let opportunities = scan_paths(
                &self.config.paths,
                &indexes,
                self.tracker.snapshot(),
                self.config.max_amount_in,
                self.config.step_size,
            );

            info!(
                "Block {}: {} pools touched, {} paths scanned, {} profitable in {:?}",
                update.block_number,
                touched.len(),
                indexes.len(),
                opportunities.len(),
                now.elapsed()
            );

            for opportunity in opportunities {
                warn!(
                    "                  ------> Path #{} spread {:.4}%",
                    opportunity.path_index, opportunity.spread_percent
                );
                warn!(
                    "                  ------> Optimal in: {} units, expected profit: {}",
                    opportunity.optimal_amount_in, opportunity.expected_profit
                );

                match self.config.opportunity_sender.try_send(opportunity) {
                    Ok(_) => (),
                    Err(TrySendError::Full(_)) => break,
                    Err(TrySendError::Closed(_)) => return,
                }
            }
        }
    }
}
