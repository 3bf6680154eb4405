// src/settlement.rs
//
// Translates protocol operations into contract calls over the injected
// transport. This layer never retries `executeTrade` on its own: only the
// orchestrator knows whether a retry needs a fresh commitment.

use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::abi;
use crate::error::{RpcError, TradeError};
use crate::models::{BalanceSnapshot, Denomination, OnChainData, ProofArtifact};
use crate::rpc::{RpcTransport, TxParams, TxReceipt};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct SettlementClient<T: RpcTransport> {
    transport: Arc<T>,
    contract: Address,
    call_timeout: Duration,
}

impl<T: RpcTransport> SettlementClient<T> {
    pub fn new(transport: Arc<T>, contract: Address, call_timeout: Duration) -> Self {
        Self {
            transport,
            contract,
            call_timeout,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Submits a commitment hash and waits for its confirmation. Gas
    /// estimation failure means the node refused admission; a send rejection
    /// means the user (or their wallet) declined.
    pub async fn submit_commitment(&self, hash: H256) -> Result<TxReceipt, TradeError> {
        let params = TxParams {
            to: self.contract,
            data: abi::submit_commitment_call(hash),
            value: U256::zero(),
        };

        match self.with_deadline(self.transport.estimate_gas(&params)).await {
            Ok(_) => {}
            Err(RpcError::Unavailable(detail)) => return Err(TradeError::RpcUnavailable(detail)),
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
            Err(RpcError::Rejected(detail)) => return Err(TradeError::NetworkRejected(detail)),
        }

        let tx_hash = match self.with_deadline(self.transport.send_transaction(params)).await {
            Ok(hash) => hash,
            Err(RpcError::Rejected(_)) => return Err(TradeError::UserCancelled),
            Err(RpcError::Unavailable(detail)) => return Err(TradeError::RpcUnavailable(detail)),
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
        };

        println!(
            "[Settlement] Commitment 0x{} submitted, tx {:#x}",
            hex::encode(hash),
            tx_hash
        );
        let receipt = self.await_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(TradeError::ContractRevert(format!(
                "submitCommitment reverted on-chain, tx {:#x}",
                tx_hash
            )));
        }
        Ok(receipt)
    }

    /// Executes a committed trade. Reverts are decoded into the protocol
    /// taxonomy; never retried here.
    pub async fn execute_trade(
        &self,
        artifact: &ProofArtifact,
        working_size: U256,
        is_long: bool,
        denomination: Denomination,
    ) -> Result<TxReceipt, TradeError> {
        let params = TxParams {
            to: self.contract,
            data: abi::execute_trade_call(artifact, working_size, is_long, denomination),
            value: U256::zero(),
        };

        match self.with_deadline(self.transport.estimate_gas(&params)).await {
            Ok(_) => {}
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
            Err(RpcError::Unavailable(detail)) => return Err(TradeError::RpcUnavailable(detail)),
            Err(RpcError::Rejected(detail)) => return Err(TradeError::NetworkRejected(detail)),
        }

        let tx_hash = match self.with_deadline(self.transport.send_transaction(params)).await {
            Ok(hash) => hash,
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
            Err(RpcError::Rejected(_)) => return Err(TradeError::UserCancelled),
            Err(RpcError::Unavailable(detail)) => return Err(TradeError::RpcUnavailable(detail)),
        };

        println!("[Settlement] executeTrade sent, tx {:#x}", tx_hash);
        let receipt = self.await_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(TradeError::ContractRevert(format!(
                "executeTrade reverted on-chain, tx {:#x}",
                tx_hash
            )));
        }
        Ok(receipt)
    }

    /// Funds the settlement balance. Native deposits carry the amount as
    /// transaction value; stable deposits move tokens inside the contract.
    pub async fn deposit(
        &self,
        denomination: Denomination,
        amount: U256,
    ) -> Result<TxReceipt, TradeError> {
        let value = match denomination {
            Denomination::Native => amount,
            Denomination::Stable => U256::zero(),
        };
        let params = TxParams {
            to: self.contract,
            data: abi::deposit_call(denomination, amount),
            value,
        };

        let tx_hash = match self.with_deadline(self.transport.send_transaction(params)).await {
            Ok(hash) => hash,
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
            Err(RpcError::Rejected(_)) => return Err(TradeError::UserCancelled),
            Err(RpcError::Unavailable(detail)) => return Err(TradeError::RpcUnavailable(detail)),
        };

        println!(
            "[Settlement] Deposit of {} ({:?}) sent, tx {:#x}",
            amount, denomination, tx_hash
        );
        let receipt = self.await_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(TradeError::ContractRevert(format!(
                "deposit reverted on-chain, tx {:#x}",
                tx_hash
            )));
        }
        Ok(receipt)
    }

    /// Reads the trader's settlement balance for one denomination. Failures
    /// surface as `RpcUnavailable`; callers treat that as balance-unknown,
    /// never as zero.
    pub async fn read_balance(
        &self,
        trader: Address,
        denomination: Denomination,
    ) -> Result<BalanceSnapshot, TradeError> {
        let data = abi::balance_of_call(trader, denomination);
        let raw = match self.with_deadline(self.transport.call(self.contract, data)).await {
            Ok(raw) => raw,
            Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
            Err(e) => return Err(TradeError::RpcUnavailable(e.to_string())),
        };
        let (available, locked) = abi::decode_balance_return(&raw)?;
        Ok(BalanceSnapshot { available, locked })
    }

    /// Best-effort receipt lookup for ledger enrichment. Any failure yields
    /// `None` rather than an error; history records are written either way.
    /// A receipt without a block number is still pending and produces no
    /// enrichment.
    pub async fn fetch_on_chain_data(&self, tx_hash: H256) -> Option<OnChainData> {
        match self
            .with_deadline(self.transport.get_transaction_receipt(tx_hash))
            .await
        {
            Ok(Some(receipt)) => receipt.block_number.map(|block_number| OnChainData {
                block_number,
                confirmed_trader: receipt.from.map(|a| format!("{:#x}", a)),
                settled_collateral: None,
            }),
            Ok(None) => None,
            Err(e) => {
                eprintln!("[Settlement] Receipt lookup for {:#x} failed: {}", tx_hash, e);
                None
            }
        }
    }

    /// Polls for a transaction receipt until the call timeout elapses.
    async fn await_receipt(&self, tx_hash: H256) -> Result<TxReceipt, TradeError> {
        let deadline = Instant::now() + self.call_timeout;
        loop {
            match self
                .with_deadline(self.transport.get_transaction_receipt(tx_hash))
                .await
            {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(RpcError::Reverted(data)) => return Err(abi::decode_revert(&data)),
                Err(e) => return Err(TradeError::RpcUnavailable(e.to_string())),
            }
            if Instant::now() >= deadline {
                return Err(TradeError::RpcUnavailable(format!(
                    "no receipt for {:#x} within {:?}",
                    tx_hash, self.call_timeout
                )));
            }
            sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    /// Applies the explicit RPC deadline; an elapsed timeout is reported as
    /// an unavailable endpoint instead of hanging the attempt.
    async fn with_deadline<F, V>(&self, fut: F) -> Result<V, RpcError>
    where
        F: std::future::Future<Output = Result<V, RpcError>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Unavailable(format!(
                "rpc call exceeded {:?}",
                self.call_timeout
            ))),
        }
    }
}
