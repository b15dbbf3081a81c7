use alloy::primitives::U256;

/// Constant-product swap output for a UniswapV2-style pool.
///
/// `fee` is in parts per 100000 (300 = 0.3%); `fee / 100` gives the
/// parts-per-1000 multiplier the pair contract applies. All arithmetic is
/// integer U256 so the truncation matches the on-chain formula exactly.
/// A zero denominator (empty pool) yields a zero output, not an error, and
/// a fee of 100% or more eats the whole input the same way.
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee: U256) -> U256 {
    let fee = fee / U256::from(100);
    let amount_in_with_fee = amount_in.saturating_mul(U256::from(1000).saturating_sub(fee));
    let numerator = amount_in_with_fee.saturating_mul(reserve_out);
    let denominator = reserve_in
        .saturating_mul(U256::from(1000))
        .saturating_add(amount_in_with_fee);

    if denominator.is_zero() {
        return U256::ZERO;
    }

    numerator / denominator
}

/// Decimal-adjusted price of a pool from its reserves. Display and
/// estimation only; never drives on-chain amounts, so f64 is fine here.
pub fn reserves_to_price(reserve0: U256, reserve1: U256, decimals0: u8, decimals1: u8, token0_in: bool) -> f64 {
    let r0 = u256_to_f64(reserve0);
    let r1 = u256_to_f64(reserve1);
    if r0 == 0.0 || r1 == 0.0 {
        return 0.0;
    }

    let price = r1 / r0 * 10f64.powi(decimals0 as i32 - decimals1 as i32);
    if token0_in {
        price
    } else {
        1.0 / price
    }
}

/// Lossy widening via the decimal string, good enough for display math.
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(0.0)
}
