//! External data accessors injected into agents.
//!
//! Agents never talk to a node directly; they depend on the narrow
//! capability traits below so tests can substitute canned responses.
//! `ChainFetcher` is the production implementation, backed by `eth_call`
//! against an alloy provider.

use crate::abi;
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Current total supply of a pool token.
#[async_trait]
pub trait SupplySource: Send + Sync {
    async fn total_supply(&self, token: Address) -> Result<U256>;
}

/// The oracle address registered against a reality module at a block tag.
#[async_trait]
pub trait OracleResolver: Send + Sync {
    async fn oracle(&self, reality_module: Address, block: BlockId) -> Result<Address>;
}

/// Production accessor: plain `eth_call` view reads, no retries or caching.
pub struct ChainFetcher<P> {
    provider: P,
}

impl<P> ChainFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

fn view_call(to: Address, selector: [u8; 4]) -> TransactionRequest {
    TransactionRequest {
        to: Some(TxKind::Call(to)),
        input: TransactionInput::new(Bytes::copy_from_slice(&selector)),
        ..Default::default()
    }
}

#[async_trait]
impl<P> SupplySource for ChainFetcher<P>
where
    P: Provider + Send + Sync,
{
    async fn total_supply(&self, token: Address) -> Result<U256> {
        let req = view_call(token, abi::selector(abi::TOTAL_SUPPLY_FUNCTION));
        let out = self.provider.call(req).await?;
        abi::word(&out, 0).ok_or_else(|| anyhow!("empty totalSupply() response from {token}"))
    }
}

#[async_trait]
impl<P> OracleResolver for ChainFetcher<P>
where
    P: Provider + Send + Sync,
{
    async fn oracle(&self, reality_module: Address, block: BlockId) -> Result<Address> {
        let req = view_call(reality_module, abi::selector(abi::ORACLE_FUNCTION));
        let out = self.provider.call(req).block(block).await?;
        abi::word_address(&out, 0)
            .ok_or_else(|| anyhow!("empty oracle() response from {reality_module}"))
    }
}
