use alloy::primitives::I256;

/// A positive-spread arbitrage opportunity found for one block. Ephemeral,
/// never persisted.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// Index of the path in the generated path set.
    pub path_index: usize,
    /// Optimized input in whole base-token units.
    pub optimal_amount_in: u64,
    /// Expected profit in the base token's smallest unit.
    pub expected_profit: I256,
    /// Percentage gain at unit input size.
    pub spread_percent: f64,
}
