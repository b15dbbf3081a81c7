use std::collections::HashSet;
use std::sync::Arc;

use alloy::primitives::Address;

use super::pool::Pool;

/// One swap through a single pool. `zero_for_one` is true when token0 is
/// being sold into the pool.
#[derive(Debug, Clone)]
pub struct SwapHop {
    pub pool: Arc<Pool>,
    pub zero_for_one: bool,
}

impl SwapHop {
    pub fn token_in(&self) -> Address {
        if self.zero_for_one {
            self.pool.token0
        } else {
            self.pool.token1
        }
    }

    pub fn token_out(&self) -> Address {
        if self.zero_for_one {
            self.pool.token1
        } else {
            self.pool.token0
        }
    }

    pub fn decimals_in(&self) -> u8 {
        if self.zero_for_one {
            self.pool.decimals0
        } else {
            self.pool.decimals1
        }
    }
}

/// One leg of the on-chain order transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapLeg {
    pub router: Address,
    pub token_in: Address,
    pub token_out: Address,
}

/// A closed cyclic trading path of 2 or 3 hops. Each hop's output token is
/// the next hop's input token and the last hop's output token is the first
/// hop's input token; pools are pairwise distinct by address.
#[derive(Debug, Clone)]
pub struct ArbPath {
    pub hops: Vec<SwapHop>,
}

impl ArbPath {
    pub fn new(hops: Vec<SwapHop>) -> Self {
        Self { hops }
    }

    /// Number of hops (2 or 3).
    pub fn nhop(&self) -> usize {
        self.hops.len()
    }

    pub fn has_pool(&self, address: &Address) -> bool {
        self.hops.iter().any(|hop| hop.pool.address == *address)
    }

    /// True if any pool in the path trades a blacklisted token. Every hop is
    /// inspected.
    pub fn should_blacklist(&self, blacklist: &HashSet<Address>) -> bool {
        self.hops
            .iter()
            .any(|hop| blacklist.contains(&hop.pool.token0) || blacklist.contains(&hop.pool.token1))
    }

    /// Input token of the whole cycle.
    pub fn token_in(&self) -> Address {
        self.hops[0].token_in()
    }

    /// Decimals of the cycle's input token.
    pub fn token_in_decimals(&self) -> u8 {
        self.hops[0].decimals_in()
    }

    /// Per-hop (router, tokenIn, tokenOut) legs for the order transaction.
    /// `routers` must hold one router address per hop.
    pub fn swap_legs(&self, routers: &[Address]) -> Vec<SwapLeg> {
        self.hops
            .iter()
            .zip(routers)
            .map(|(hop, router)| SwapLeg { router: *router, token_in: hop.token_in(), token_out: hop.token_out() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pool::DexVariant;

    fn pool(addr: u8, token0: u8, token1: u8) -> Arc<Pool> {
        Arc::new(Pool {
            address: Address::repeat_byte(addr),
            variant: DexVariant::UniswapV2,
            token0: Address::repeat_byte(token0),
            token1: Address::repeat_byte(token1),
            decimals0: 18,
            decimals1: 6,
            fee: 300,
        })
    }

    #[test]
    fn test_hop_tokens_follow_direction() {
        let p = pool(0xaa, 1, 2);
        let forward = SwapHop { pool: p.clone(), zero_for_one: true };
        assert_eq!(forward.token_in(), Address::repeat_byte(1));
        assert_eq!(forward.token_out(), Address::repeat_byte(2));
        assert_eq!(forward.decimals_in(), 18);

        let backward = SwapHop { pool: p, zero_for_one: false };
        assert_eq!(backward.token_in(), Address::repeat_byte(2));
        assert_eq!(backward.token_out(), Address::repeat_byte(1));
        assert_eq!(backward.decimals_in(), 6);
    }

    #[test]
    fn test_blacklist_covers_all_hops() {
        let path = ArbPath::new(vec![
            SwapHop { pool: pool(0xaa, 1, 2), zero_for_one: true },
            SwapHop { pool: pool(0xbb, 2, 3), zero_for_one: true },
            SwapHop { pool: pool(0xcc, 3, 1), zero_for_one: true },
        ]);

        // Token only traded by the last hop must still trip the check.
        let blacklist = HashSet::from([Address::repeat_byte(3)]);
        assert!(path.should_blacklist(&blacklist));

        let unrelated = HashSet::from([Address::repeat_byte(9)]);
        assert!(!path.should_blacklist(&unrelated));
    }

    #[test]
    fn test_swap_legs() {
        let path = ArbPath::new(vec![
            SwapHop { pool: pool(0xaa, 1, 2), zero_for_one: true },
            SwapHop { pool: pool(0xbb, 1, 2), zero_for_one: false },
        ]);
        let router = Address::repeat_byte(0xee);

        let legs = path.swap_legs(&[router, router]);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].token_in, Address::repeat_byte(1));
        assert_eq!(legs[0].token_out, Address::repeat_byte(2));
        assert_eq!(legs[1].token_in, Address::repeat_byte(2));
        assert_eq!(legs[1].token_out, Address::repeat_byte(1));
        assert!(legs.iter().all(|leg| leg.router == router));
    }
}
