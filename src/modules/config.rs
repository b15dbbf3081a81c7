use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use alloy::pubsub::PubSubFrontend;
use alloy::rpc::client::ClientBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::ws::WsConnect;
use eyre::{eyre, Result, WrapErr};
use log::{debug, info};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::modules::bundler::Flashloan;
use crate::modules::paths::generate_cyclic_paths;
use crate::modules::pool_loader::load_pools;
use crate::types::events::BlockUpdate;
use crate::types::opportunity::Opportunity;
use crate::types::path::ArbPath;
use crate::types::pool::Pool;
use crate::utils::{constants, helpers};

/// Chain state shared across tasks.
pub struct AppState {
    pub block_number: RwLock<u64>,
    pub next_block_base_fee: RwLock<u64>,
}

/// Runtime configuration plus the channels wiring the pipeline together.
/// Built once at startup and shared behind an `Arc`.
pub struct Config {
    pub provider: Arc<RootProvider<PubSubFrontend>>,
    pub chain_id: u64,
    pub sender: PrivateKeySigner,
    pub relay_signer: PrivateKeySigner,
    pub bot_address: Address,
    pub relay_url: String,
    pub router: Address,
    pub base_token: Address,
    pub base_token_decimals: u8,
    pub max_amount_in: u64,
    pub step_size: u64,
    pub default_priority_gwei: u64,
    pub flashloan: Flashloan,
    pub loan_from: Address,
    pub pools: Vec<Arc<Pool>>,
    pub paths: Arc<Vec<ArbPath>>,
    pub app_state: Arc<AppState>,
    pub block_update_sender: mpsc::Sender<BlockUpdate>,
    pub block_update_receiver: Mutex<mpsc::Receiver<BlockUpdate>>,
    pub opportunity_sender: mpsc::Sender<Opportunity>,
    pub opportunity_receiver: Mutex<mpsc::Receiver<Opportunity>>,
}

impl Config {
    pub async fn new(ws_url: String, priv_key: String) -> Result<Self> {
        let ws = ClientBuilder::default()
            .ws(WsConnect::new(&ws_url))
            .await
            .wrap_err("Failed to connect to WebSocket provider")?;
        let provider = Arc::new(RootProvider::<PubSubFrontend>::new(ws));
        let chain_id = provider.get_chain_id().await?;
        info!("Connected to chain {}", chain_id);

        let sender: PrivateKeySigner =
            priv_key.parse().map_err(|_| eyre!("PRIVATE_KEY is not a valid key"))?;
        let relay_signer: PrivateKeySigner = env_var("SIGNING_KEY")?
            .parse()
            .map_err(|_| eyre!("SIGNING_KEY is not a valid key"))?;
        let bot_address: Address = env_var("BOT_ADDRESS")?
            .parse()
            .map_err(|_| eyre!("BOT_ADDRESS is not a valid address"))?;

        let relay_url = env_or("RELAY_URL", constants::DEFAULT_RELAY_URL);
        let router = helpers::address(&env_or("ROUTER_ADDRESS", constants::V2_ROUTER))?;
        let base_token = helpers::address(&env_or("BASE_TOKEN", constants::USDC))?;
        let base_token_decimals: u8 = parse_env("BASE_TOKEN_DECIMALS", constants::USDC_DECIMALS)?;
        let max_amount_in: u64 = parse_env("MAX_AMOUNT_IN", 1000)?;
        let step_size: u64 = parse_env("STEP_SIZE", 10)?;
        let default_priority_gwei: u64 = parse_env("DEFAULT_PRIORITY_GWEI", 1)?;
        let loan_from = helpers::address(&env_or(
            "LOAN_FROM",
            "0x0000000000000000000000000000000000000000",
        ))?;
        let flashloan = match parse_env::<u8>("FLASHLOAN", 0)? {
            0 => Flashloan::NotUsed,
            1 => Flashloan::Balancer,
            2 => Flashloan::UniswapV2,
            other => return Err(eyre!("Unknown FLASHLOAN value: {}", other)),
        };

        let blacklist: HashSet<Address> = std::env::var("BLACKLIST_TOKENS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|_| eyre!("Bad address in BLACKLIST_TOKENS: {}", s))
            })
            .collect::<Result<_>>()?;

        debug!("Loading pools...");
        let pools_csv = PathBuf::from(env_or("POOLS_CSV", "data/pools.csv"));
        let pools = load_pools(&pools_csv)?;

        let mut paths = generate_cyclic_paths(&pools, base_token);
        paths.retain(|path| !path.should_blacklist(&blacklist));

        // Keep only pools that still appear on some surviving path.
        let used: HashSet<Address> = paths
            .iter()
            .flat_map(|path| path.hops.iter().map(|hop| hop.pool.address))
            .collect();
        let pools: Vec<Arc<Pool>> =
            pools.into_iter().filter(|pool| used.contains(&pool.address)).collect();

        info!("{} pools across {} paths after blacklist", pools.len(), paths.len());

        let (block_update_sender, block_update_receiver) = mpsc::channel(100);
        let (opportunity_sender, opportunity_receiver) = mpsc::channel(100);

        Ok(Self {
            provider,
            chain_id,
            sender,
            relay_signer,
            bot_address,
            relay_url,
            router,
            base_token,
            base_token_decimals,
            max_amount_in,
            step_size,
            default_priority_gwei,
            flashloan,
            loan_from,
            pools,
            paths: Arc::new(paths),
            app_state: Arc::new(AppState {
                block_number: RwLock::new(0),
                next_block_base_fee: RwLock::new(0),
            }),
            block_update_sender,
            block_update_receiver: Mutex::new(block_update_receiver),
            opportunity_sender,
            opportunity_receiver: Mutex::new(opportunity_receiver),
        })
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| eyre!("{} must be set", name))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| eyre!("{} is not a valid value", name)),
        Err(_) => Ok(default),
    }
}
