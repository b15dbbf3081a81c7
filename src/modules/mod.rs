pub mod amm;
pub mod blocks_updater;
pub mod bundler;
pub mod config;
pub mod evaluator;
pub mod gas;
pub mod opportunity_finder;
pub mod paths;
pub mod pool_loader;
pub mod relay;
pub mod reserve_tracker;
pub mod transaction_executor;
