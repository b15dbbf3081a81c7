use alloy::primitives::{Address, U256};

/// A single observed reserve change, decoded from a pool's Sync log.
#[derive(Debug, Clone, Copy)]
pub struct ReserveEvent {
    pub pool: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    /// Position of the emitting transaction within its block. Used to pick
    /// the last write when one pool changes several times in a block.
    pub tx_index: u64,
}

/// Everything the scanner needs for one block: the block boundary, the
/// predicted next base fee and the reserve changes observed in the block.
#[derive(Debug, Clone)]
pub struct BlockUpdate {
    pub block_number: u64,
    pub next_base_fee: u64,
    pub events: Vec<ReserveEvent>,
}
