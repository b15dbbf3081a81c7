use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// DEX protocol variant of a pool, as tagged in the cached pool file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DexVariant {
    UniswapV2 = 2,
    UniswapV3 = 3,
}

/// A two-token constant-product liquidity pool. Immutable after creation,
/// identified by its address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub variant: DexVariant,

    pub token0: Address,
    pub token1: Address,

    pub decimals0: u8,
    pub decimals1: u8,

    /// Fee in parts per 100000, e.g. 300 = 0.3%.
    pub fee: u32,
}

impl Pool {
    /// Swap direction when selling `token_in` into this pool, or `None`
    /// if the pool does not trade that token.
    pub fn direction_from(&self, token_in: Address) -> Option<bool> {
        if self.token0 == token_in {
            Some(true)
        } else if self.token1 == token_in {
            Some(false)
        } else {
            None
        }
    }
}
