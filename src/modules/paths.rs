use std::sync::Arc;

use alloy::primitives::Address;
use log::info;

use crate::types::path::{ArbPath, SwapHop};
use crate::types::pool::Pool;

/// Enumerates all closed 2- and 3-hop cycles through `base_token`.
///
/// Nested O(n³) search over the pool set: for each first pool trading the
/// base token, each second pool consuming the first hop's output, and each
/// third pool that closes the cycle back to the base token. Pools within a
/// path are pairwise distinct by address; no further dedup, so a triangle is
/// emitted once per orientation. Runs once offline against the filtered pool
/// universe, never on the hot path. Enumeration order follows the input
/// order, which makes the path index a stable identifier.
pub fn generate_cyclic_paths(pools: &[Arc<Pool>], base_token: Address) -> Vec<ArbPath> {
    let mut paths = Vec::new();

    for pool1 in pools {
        let Some(zero_for_one1) = pool1.direction_from(base_token) else {
            continue;
        };
        let hop1 = SwapHop { pool: pool1.clone(), zero_for_one: zero_for_one1 };
        let token_out1 = hop1.token_out();

        for pool2 in pools {
            if pool2.address == pool1.address {
                continue;
            }
            let Some(zero_for_one2) = pool2.direction_from(token_out1) else {
                continue;
            };
            let hop2 = SwapHop { pool: pool2.clone(), zero_for_one: zero_for_one2 };
            let token_out2 = hop2.token_out();

            if token_out2 == base_token {
                // 2-hop cycle. No third pool can extend it: it would have to
                // trade the base token into itself.
                paths.push(ArbPath::new(vec![hop1.clone(), hop2]));
                continue;
            }

            for pool3 in pools {
                if pool3.address == pool1.address || pool3.address == pool2.address {
                    continue;
                }
                let Some(zero_for_one3) = pool3.direction_from(token_out2) else {
                    continue;
                };
                let hop3 = SwapHop { pool: pool3.clone(), zero_for_one: zero_for_one3 };
                if hop3.token_out() == base_token {
                    paths.push(ArbPath::new(vec![hop1.clone(), hop2.clone(), hop3]));
                }
            }
        }
    }

    info!("Generated {} cyclic arbitrage paths", paths.len());
    paths
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
            decimals1: 18,
            fee: 300,
        })
    }

    #[test]
    fn test_triangle_with_unrelated_pool() {
        // A-B, B-C, C-A triangle plus a D-E pool never touching the base
        // token A. The triangle closes in both orientations; the unrelated
        // pool appears in no cycle.
        let pools = vec![pool(0x11, 1, 2), pool(0x22, 2, 3), pool(0x33, 3, 1), pool(0x44, 4, 5)];
        let base = Address::repeat_byte(1);

        let paths = generate_cyclic_paths(&pools, base);

        assert_eq!(paths.len(), 2);
        for path in &paths {
            assert_eq!(path.nhop(), 3);
            assert_eq!(path.token_in(), base);
            assert_eq!(path.hops.last().unwrap().token_out(), base);
            assert!(!path.has_pool(&Address::repeat_byte(0x44)));
        }

        // The two emissions are the same triangle walked in opposite
        // directions.
        let first: Vec<Address> = paths[0].hops.iter().map(|h| h.pool.address).collect();
        let mut second: Vec<Address> = paths[1].hops.iter().map(|h| h.pool.address).collect();
        second.reverse();
        assert_eq!(first, second);
    }

    #[test]
    fn test_two_hop_cycle_needs_distinct_pools() {
        // A single A-B pool cannot close a 2-hop cycle on itself.
        let pools = vec![pool(0x11, 1, 2)];
        assert!(generate_cyclic_paths(&pools, Address::repeat_byte(1)).is_empty());

        // Two distinct A-B pools close it in both orders.
        let pools = vec![pool(0x11, 1, 2), pool(0x22, 1, 2)];
        let paths = generate_cyclic_paths(&pools, Address::repeat_byte(1));
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.nhop() == 2));
    }

    #[test]
    fn test_hop_chaining_invariant() {
        let pools = vec![pool(0x11, 1, 2), pool(0x22, 2, 3), pool(0x33, 3, 1)];
        let base = Address::repeat_byte(1);

        for path in generate_cyclic_paths(&pools, base) {
            for pair in path.hops.windows(2) {
                assert_eq!(pair[0].token_out(), pair[1].token_in());
            }
        }
    }

    #[test]
    fn test_no_paths_when_base_token_absent() {
        let pools = vec![pool(0x11, 2, 3), pool(0x22, 3, 4)];
        assert!(generate_cyclic_paths(&pools, Address::repeat_byte(1)).is_empty());
    }
}
