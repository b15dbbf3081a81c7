use std::collections::HashMap;

use alloy::primitives::{Address, I256, U256};

use super::amm;
use crate::types::path::ArbPath;

/// Simulates a path's final output for `amount_in` whole base-token units.
///
/// The input is scaled by the base token's decimals, then composed through
/// `amount_out` hop by hop. Returns `None` when the snapshot has no entry
/// for one of the path's pools: the path is currently unevaluable (e.g. the
/// snapshot is still warming up), which is not an error.
pub fn simulate_path(
    path: &ArbPath,
    amount_in: u64,
    reserves: &HashMap<Address, (U256, U256)>,
) -> Option<U256> {
    let decimals = path.token_in_decimals();
    let mut amount = U256::from(amount_in) * U256::from(10).pow(U256::from(decimals));

    for hop in &path.hops {
        let &(reserve0, reserve1) = reserves.get(&hop.pool.address)?;
        let (reserve_in, reserve_out) = if hop.zero_for_one { (reserve0, reserve1) } else { (reserve1, reserve0) };
        amount = amm::amount_out(amount, reserve_in, reserve_out, U256::from(hop.pool.fee));
    }

    Some(amount)
}

/// Monotone step search for the profit-maximizing input over
/// `{0, step, 2·step, …} ≤ max`. Stops at the first step whose profit is
/// strictly worse than the best so far, which finds the true maximum only
/// when the profit curve is unimodal; on other curves it settles for the
/// first local maximum. `None` means the profit function itself could not
/// be evaluated.
pub fn step_search(
    max: u64,
    step: u64,
    profit: impl Fn(u64) -> Option<I256>,
) -> Option<(u64, I256)> {
    let mut best_in = 0u64;
    let mut best = I256::ZERO;

    let mut amount = 0u64;
    loop {
        let this_profit = profit(amount)?;
        if this_profit >= best {
            best_in = amount;
            best = this_profit;
        } else {
            break;
        }

        if step == 0 || amount >= max {
            break;
        }
        amount = max.min(amount + step);
    }

    Some((best_in, best))
}

/// Finds the best input amount for a path against the given snapshot.
///
/// Returns the optimal input in whole base-token units together with its
/// profit in the base token's smallest unit, or `None` when the path is
/// unevaluable against the snapshot.
pub fn optimize_amount_in(
    path: &ArbPath,
    max_amount_in: u64,
    step_size: u64,
    reserves: &HashMap<Address, (U256, U256)>,
) -> Option<(u64, I256)> {
    let decimals_factor = U256::from(10).pow(U256::from(path.token_in_decimals()));

    step_search(max_amount_in, step_size, |amount_in| {
        let out = simulate_path(path, amount_in, reserves)?;
        let spent = U256::from(amount_in) * decimals_factor;
        Some(I256::from_raw(out).saturating_sub(I256::from_raw(spent)))
    })
}
