use log::{debug, warn};
use rand::Rng;
use serde::Deserialize;

/// Fee pair used for EIP-1559 bundle transactions, in wei.
#[derive(Debug, Clone, Copy)]
pub struct GasEstimate {
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
}

/// Computes the base fee of the next block from the current block header
/// per EIP-1559, plus a small random offset so the prediction is never an
/// exact tie against competing bundles.
pub fn next_block_base_fee(base_fee_per_gas: u64, gas_used: u64, gas_limit: u64) -> u64 {
    let base_fee = base_fee_per_gas as u128;
    let gas_used = gas_used as u128;
    let gas_target = ((gas_limit / 2) as u128).max(1);

    let next = if gas_used == gas_target {
        base_fee
    } else if gas_used > gas_target {
        let gas_used_delta = gas_used - gas_target;
        let base_fee_delta = base_fee * gas_used_delta / gas_target / 8;
        base_fee + base_fee_delta
    } else {
        let gas_used_delta = gas_target - gas_used;
        let base_fee_delta = base_fee * gas_used_delta / gas_target / 8;
        base_fee.saturating_sub(base_fee_delta)
    };

    next as u64 + rand::thread_rng().gen_range(0..10)
}

/// Fees to fall back on when the external estimator is unavailable:
/// a flat priority fee on top of the predicted base fee.
pub fn fallback_gas(next_base_fee: u64, default_priority_gwei: u64) -> GasEstimate {
    let priority = default_priority_gwei as u128 * 1_000_000_000;
    GasEstimate {
        max_priority_fee_per_gas: priority,
        max_fee_per_gas: next_base_fee as u128 + priority,
    }
}

#[derive(Deserialize)]
struct BlocknativeResponse {
    #[serde(rename = "blockPrices")]
    block_prices: Vec<BlockPrice>,
}

#[derive(Deserialize)]
struct BlockPrice {
    #[serde(rename = "estimatedPrices")]
    estimated_prices: Vec<EstimatedPrice>,
}

#[derive(Deserialize)]
struct EstimatedPrice {
    confidence: u64,
    #[serde(rename = "maxPriorityFeePerGas")]
    max_priority_fee_per_gas: f64,
    #[serde(rename = "maxFeePerGas")]
    max_fee_per_gas: f64,
}

/// Asks Blocknative for a next-block fee estimate at the highest confidence
/// level it reports. Returns `None` when the token is not configured, the
/// chain is unsupported, or the request fails for any reason.
pub async fn estimate_next_block_gas(chain_id: u64) -> Option<GasEstimate> {
    let token = std::env::var("BLOCKNATIVE_TOKEN").ok()?;
    if chain_id != 1 && chain_id != 137 {
        return None;
    }

    let url = format!("https://api.blocknative.com/gasprices/blockprices?chainid={}", chain_id);
    let response = match reqwest::Client::new()
        .get(&url)
        .header("Authorization", token)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("Blocknative request failed: {}", e);
            return None;
        }
    };

    let parsed: BlocknativeResponse = match response.json().await {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Blocknative response was malformed: {}", e);
            return None;
        }
    };

    let price = parsed
        .block_prices
        .first()?
        .estimated_prices
        .iter()
        .max_by_key(|p| p.confidence)?;

    debug!(
        "Blocknative estimate: priority {} gwei, max {} gwei",
        price.max_priority_fee_per_gas, price.max_fee_per_gas
    );

    Some(GasEstimate {
        max_priority_fee_per_gas: (price.max_priority_fee_per_gas * 1e9) as u128,
        max_fee_per_gas: (price.max_fee_per_gas * 1e9) as u128,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The jitter adds 0..=9 wei, so assert a window rather than equality.
    fn assert_with_jitter(actual: u64, expected: u64) {
        assert!(
            actual >= expected && actual <= expected + 9,
            "expected {} within [{}, {}]",
            actual,
            expected,
            expected + 9
        );
    }

    #[test]
    fn test_base_fee_unchanged_at_target() {
        assert_with_jitter(next_block_base_fee(100_000_000_000, 15_000_000, 30_000_000), 100_000_000_000);
    }

    #[test]
    fn test_base_fee_rises_on_full_block() {
        // Full block: delta = base / 8.
        assert_with_jitter(next_block_base_fee(80_000_000_000, 30_000_000, 30_000_000), 90_000_000_000);
    }

    #[test]
    fn test_base_fee_falls_on_empty_block() {
        // Empty block: delta = base / 8.
        assert_with_jitter(next_block_base_fee(80_000_000_000, 0, 30_000_000), 70_000_000_000);
    }

    #[test]
    fn test_zero_gas_limit_does_not_divide_by_zero() {
        let fee = next_block_base_fee(100, 0, 0);
        assert!(fee <= 100 + 9);
    }

    #[test]
    fn test_fallback_gas() {
        let estimate = fallback_gas(50_000_000_000, 2);
        assert_eq!(estimate.max_priority_fee_per_gas, 2_000_000_000);
        assert_eq!(estimate.max_fee_per_gas, 52_000_000_000);
    }
}
