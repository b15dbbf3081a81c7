//ETH Mainnet adresses
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDC_DECIMALS: u8 = 6;
pub const V2_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

pub const DEFAULT_RELAY_URL: &str = "https://relay.flashbots.net";
