use alloy::primitives::Address;
use eyre::{eyre, Result};

/// Converts &str to Address.
pub fn address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .map_err(|_| eyre!("Invalid address: {}", address))
}
