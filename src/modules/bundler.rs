use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::pubsub::PubSubFrontend;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use eyre::Result;

use crate::modules::gas::GasEstimate;
use crate::types::path::SwapLeg;

sol! {
    function recoverToken(address token);
    function approveRouter(address router, address[] tokens, bool force);
}

/// Flash loan provider baked into the order calldata. The bot contract
/// dispatches on the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flashloan {
    NotUsed = 0,
    Balancer = 1,
    UniswapV2 = 2,
}

/// A fully signed bundle ready for relay submission.
pub struct SignedBundle {
    pub txs: Vec<Bytes>,
    pub tx_hashes: Vec<B256>,
}

/// Raw order calldata for the bot contract: amount in, flash loan selector,
/// loan source, then one (router, token in, token out) triple per hop. The
/// contract reads the words positionally, so this is plain parameter
/// encoding with no function selector.
pub fn order_calldata(
    legs: &[SwapLeg],
    amount_in: U256,
    flashloan: Flashloan,
    loan_from: Address,
) -> Bytes {
    let mut values = vec![
        DynSolValue::Uint(amount_in, 256),
        DynSolValue::Uint(U256::from(flashloan as u8), 256),
        DynSolValue::Address(loan_from),
    ];
    for leg in legs {
        values.push(DynSolValue::Address(leg.router));
        values.push(DynSolValue::Address(leg.token_in));
        values.push(DynSolValue::Address(leg.token_out));
    }
    Bytes::from(DynSolValue::Tuple(values).abi_encode_params())
}

pub fn recover_token_calldata(token: Address) -> Bytes {
    Bytes::from(recoverTokenCall { token }.abi_encode())
}

pub fn approve_router_calldata(router: Address, tokens: Vec<Address>, force: bool) -> Bytes {
    Bytes::from(approveRouterCall { router, tokens, force }.abi_encode())
}

/// Builds and signs the EIP-1559 transactions that make up a bundle.
pub struct Bundler {
    provider: Arc<RootProvider<PubSubFrontend>>,
    wallet: EthereumWallet,
    sender: Address,
    bot_address: Address,
    chain_id: u64,
}

impl Bundler {
    pub fn new(
        provider: Arc<RootProvider<PubSubFrontend>>,
        signer: PrivateKeySigner,
        bot_address: Address,
        chain_id: u64,
    ) -> Self {
        let sender = signer.address();
        Self {
            provider,
            wallet: EthereumWallet::from(signer),
            sender,
            bot_address,
            chain_id,
        }
    }

    pub async fn next_nonce(&self) -> Result<u64> {
        Ok(self.provider.get_transaction_count(self.sender).await?)
    }

    fn base_tx(&self, nonce: u64, gas: &GasEstimate) -> TransactionRequest {
        TransactionRequest::default()
            .with_chain_id(self.chain_id)
            .with_from(self.sender)
            .with_nonce(nonce)
            .with_to(self.bot_address)
            .with_max_fee_per_gas(gas.max_fee_per_gas)
            .with_max_priority_fee_per_gas(gas.max_priority_fee_per_gas)
    }

    /// Funds the bot contract with native token.
    pub fn transfer_in_tx(&self, nonce: u64, amount: U256, gas: &GasEstimate) -> TransactionRequest {
        self.base_tx(nonce, gas).with_value(amount).with_gas_limit(60_000)
    }

    /// Pulls a token balance out of the bot contract.
    pub fn transfer_out_tx(&self, nonce: u64, token: Address, gas: &GasEstimate) -> TransactionRequest {
        self.base_tx(nonce, gas)
            .with_input(recover_token_calldata(token))
            .with_gas_limit(50_000)
    }

    /// Pre-approves a router for the given tokens through the bot contract.
    pub fn approve_tx(
        &self,
        nonce: u64,
        router: Address,
        tokens: Vec<Address>,
        force: bool,
        gas: &GasEstimate,
    ) -> TransactionRequest {
        let gas_limit = 55_000 * tokens.len() as u64;
        self.base_tx(nonce, gas)
            .with_input(approve_router_calldata(router, tokens, force))
            .with_gas_limit(gas_limit)
    }

    /// The arbitrage order itself.
    pub fn order_tx(
        &self,
        nonce: u64,
        legs: &[SwapLeg],
        amount_in: U256,
        flashloan: Flashloan,
        loan_from: Address,
        gas: &GasEstimate,
    ) -> TransactionRequest {
        self.base_tx(nonce, gas)
            .with_input(order_calldata(legs, amount_in, flashloan, loan_from))
            .with_gas_limit(600_000)
    }

    /// Signs each request into a raw EIP-2718 envelope.
    pub async fn sign_bundle(&self, txs: Vec<TransactionRequest>) -> Result<SignedBundle> {
        let mut raw = Vec::with_capacity(txs.len());
        let mut tx_hashes = Vec::with_capacity(txs.len());

        for tx in txs {
            let envelope = tx.build(&self.wallet).await?;
            tx_hashes.push(*envelope.tx_hash());
            raw.push(Bytes::from(envelope.encoded_2718()));
        }

        Ok(SignedBundle { txs: raw, tx_hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    #[test]
    fn test_order_calldata_word_layout() {
        let legs = vec![SwapLeg {
            router: Address::repeat_byte(0xaa),
            token_in: Address::repeat_byte(0xbb),
            token_out: Address::repeat_byte(0xcc),
        }];
        let calldata = order_calldata(
            &legs,
            U256::from(1_000_000u64),
            Flashloan::Balancer,
            Address::repeat_byte(0xdd),
        );

        // 3 fixed words plus 3 per hop, no selector.
        assert_eq!(calldata.len(), 6 * 32);

        let mut expected = Vec::new();
        expected.extend_from_slice(&U256::from(1_000_000u64).to_be_bytes::<32>());
        expected.extend_from_slice(&U256::from(1u64).to_be_bytes::<32>());
        for address in [0xdd, 0xaa, 0xbb, 0xcc] {
            expected.extend_from_slice(&[0u8; 12]);
            expected.extend_from_slice(Address::repeat_byte(address).as_slice());
        }
        assert_eq!(calldata.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_order_calldata_grows_per_hop() {
        let leg = SwapLeg {
            router: Address::repeat_byte(0xaa),
            token_in: Address::repeat_byte(0xbb),
            token_out: Address::repeat_byte(0xcc),
        };
        let three_hops = vec![leg, leg, leg];
        let calldata =
            order_calldata(&three_hops, U256::ZERO, Flashloan::NotUsed, Address::ZERO);
        assert_eq!(calldata.len(), (3 + 9) * 32);
    }

    #[test]
    fn test_recover_token_selector() {
        let calldata = recover_token_calldata(Address::repeat_byte(0x11));
        assert_eq!(&calldata[..4], &keccak256("recoverToken(address)")[..4]);
        assert_eq!(calldata.len(), 4 + 32);
    }

    #[test]
    fn test_approve_router_selector() {
        let calldata = approve_router_calldata(
            Address::repeat_byte(0x11),
            vec![Address::repeat_byte(0x22), Address::repeat_byte(0x33)],
            true,
        );
        assert_eq!(&calldata[..4], &keccak256("approveRouter(address,address[],bool)")[..4]);
    }
}
