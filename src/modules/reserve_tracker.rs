use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, U256};
use log::debug;

use crate::types::events::ReserveEvent;

/// Authoritative off-chain mirror of pool reserves.
///
/// Owned by the scanner task: one writer, whole-batch updates, so a scan
/// never observes a mix of old and new reserves within a block. Events for
/// pools outside the tracked universe are ignored.
pub struct ReserveTracker {
    tracked: HashSet<Address>,
    reserves: HashMap<Address, (U256, U256)>,
}

impl ReserveTracker {
    /// `tracked` is the pool universe the tracker accepts updates for;
    /// `initial` is a (possibly empty) starting snapshot.
    pub fn new(tracked: HashSet<Address>, initial: HashMap<Address, (U256, U256)>) -> Self {
        Self { tracked, reserves: initial }
    }

    /// Current full snapshot.
    pub fn snapshot(&self) -> &HashMap<Address, (U256, U256)> {
        &self.reserves
    }

    /// Applies one block's reserve events and returns the addresses that
    /// actually changed.
    ///
    /// When a pool emits several events within the block, only the one with
    /// the highest transaction index survives, so the snapshot reflects the
    /// pool's state at the end of the block. The highest-index bookkeeping
    /// is local to the call and therefore starts fresh at every block.
    pub fn apply_block(&mut self, events: &[ReserveEvent]) -> Vec<Address> {
        let mut highest_index: HashMap<Address, u64> = HashMap::new();
        let mut pending: HashMap<Address, (U256, U256)> = HashMap::new();

        for event in events {
            if !self.tracked.contains(&event.pool) {
                continue;
            }
            // Ties go to the later event, matching on-chain log order.
            if let Some(&seen) = highest_index.get(&event.pool) {
                if event.tx_index < seen {
                    continue;
                }
            }
            highest_index.insert(event.pool, event.tx_index);
            pending.insert(event.pool, (event.reserve0, event.reserve1));
        }

        let mut touched: Vec<Address> = Vec::with_capacity(pending.len());
        for (address, reserves) in pending {
            self.reserves.insert(address, reserves);
            touched.push(address);
        }

        debug!("Applied reserve batch: {} pools touched", touched.len());
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pool: u8, reserve0: u64, reserve1: u64, tx_index: u64) -> ReserveEvent {
        ReserveEvent {
            pool: Address::repeat_byte(pool),
            reserve0: U256::from(reserve0),
            reserve1: U256::from(reserve1),
            tx_index,
        }
    }

    fn tracker_for(pools: &[u8]) -> ReserveTracker {
        let tracked = pools.iter().map(|&b| Address::repeat_byte(b)).collect();
        ReserveTracker::new(tracked, HashMap::new())
    }

    #[test]
    fn test_highest_tx_index_wins() {
        let pool = Address::repeat_byte(0x11);

        // Ascending and descending arrival order must both settle on the
        // index-7 values.
        for events in [
            vec![event(0x11, 1, 1, 3), event(0x11, 7, 7, 7)],
            vec![event(0x11, 7, 7, 7), event(0x11, 1, 1, 3)],
        ] {
            let mut tracker = tracker_for(&[0x11]);
            let touched = tracker.apply_block(&events);
            assert_eq!(touched, vec![pool]);
            assert_eq!(tracker.snapshot()[&pool], (U256::from(7), U256::from(7)));
        }
    }

    #[test]
    fn test_index_bookkeeping_resets_per_block() {
        let pool = Address::repeat_byte(0x11);
        let mut tracker = tracker_for(&[0x11]);

        tracker.apply_block(&[event(0x11, 7, 7, 7)]);
        // A lower index in the next block is a fresh write, not a stale one.
        tracker.apply_block(&[event(0x11, 2, 2, 1)]);

        assert_eq!(tracker.snapshot()[&pool], (U256::from(2), U256::from(2)));
    }

    #[test]
    fn test_untracked_pools_are_ignored() {
        let mut tracker = tracker_for(&[0x11]);
        let touched = tracker.apply_block(&[event(0x99, 5, 5, 0)]);
        assert!(touched.is_empty());
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_touched_set_only_lists_changed_pools() {
        let mut tracker = tracker_for(&[0x11, 0x22]);
        tracker.apply_block(&[event(0x11, 1, 1, 0), event(0x22, 2, 2, 0)]);

        let touched = tracker.apply_block(&[event(0x22, 3, 3, 0)]);
        assert_eq!(touched, vec![Address::repeat_byte(0x22)]);
        // The untouched pool keeps its previous reserves.
        assert_eq!(tracker.snapshot()[&Address::repeat_byte(0x11)], (U256::from(1), U256::from(1)));
    }
}
