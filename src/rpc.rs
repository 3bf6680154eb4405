// src/rpc.rs
//
// The transport boundary: four RPC primitives the core needs, with an ethers
// adapter so any provider/signer stack can sit behind it. The core never
// assumes a specific wallet or node implementation.

use async_trait::async_trait;
use ethers::providers::{Middleware, MiddlewareError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use std::sync::Arc;

use crate::error::RpcError;

#[derive(Debug, Clone, Default)]
pub struct TxParams {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub from: Option<Address>,
    pub status: bool,
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> Result<Vec<u8>, RpcError>;
    async fn send_transaction(&self, params: TxParams) -> Result<H256, RpcError>;
    async fn estimate_gas(&self, params: &TxParams) -> Result<U256, RpcError>;
    async fn get_transaction_receipt(&self, tx_hash: H256)
        -> Result<Option<TxReceipt>, RpcError>;
}

/// Adapts any ethers `Middleware` stack (plain provider, SignerMiddleware,
/// nonce managers) to the transport boundary.
pub struct EthersTransport<M: Middleware> {
    inner: Arc<M>,
}

impl<M: Middleware> EthersTransport<M> {
    pub fn new(inner: Arc<M>) -> Self {
        Self { inner }
    }
}

fn typed_tx(params: &TxParams) -> TypedTransaction {
    TransactionRequest::new()
        .to(params.to)
        .data(params.data.clone())
        .value(params.value)
        .into()
}

fn map_middleware_err<E: MiddlewareError>(e: E) -> RpcError {
    if let Some(jsonrpc) = e.as_error_response() {
        if let Some(revert) = jsonrpc.as_revert_data() {
            return RpcError::Reverted(revert.to_vec());
        }
        return RpcError::Rejected(jsonrpc.message.clone());
    }
    RpcError::Unavailable(e.to_string())
}

#[async_trait]
impl<M: Middleware + 'static> RpcTransport for EthersTransport<M> {
    async fn call(&self, to: Address, data: Bytes) -> Result<Vec<u8>, RpcError> {
        let tx = typed_tx(&TxParams {
            to,
            data,
            value: U256::zero(),
        });
        let out = self
            .inner
            .call(&tx, None)
            .await
            .map_err(map_middleware_err)?;
        Ok(out.to_vec())
    }

    async fn send_transaction(&self, params: TxParams) -> Result<H256, RpcError> {
        let pending = self
            .inner
            .send_transaction(typed_tx(&params), None)
            .await
            .map_err(map_middleware_err)?;
        Ok(*pending)
    }

    async fn estimate_gas(&self, params: &TxParams) -> Result<U256, RpcError> {
        self.inner
            .estimate_gas(&typed_tx(params), None)
            .await
            .map_err(map_middleware_err)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TxReceipt>, RpcError> {
        let receipt = self
            .inner
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(map_middleware_err)?;
        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number.map(|b| b.as_u64()),
            from: Some(r.from),
            status: r.status.map(|s| s.as_u64() == 1).unwrap_or(false),
        }))
    }
}
