// src/orchestrator.rs
//
// The commit -> submit -> prove -> execute state machine. One attempt is
// strictly sequential; the arena lets the host run many attempts at once,
// each owning its own commitment and secret. Every fallback is a tagged
// transition inside this single machine, not a separate code path.

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::collateral;
use crate::commitment;
use crate::error::TradeError;
use crate::ledger::TradeHistoryLedger;
use crate::models::{
    pair_symbol, AttemptState, CollateralQuote, ProofArtifact, TradeAttempt, TradeHistoryRecord,
    TradeIntent, TradeStatus,
};
use crate::prover::ProofGenerator;
use crate::rpc::RpcTransport;
use crate::settlement::SettlementClient;

/// Hard ceiling on `executeTrade` sends per attempt. One commitment
/// regeneration OR one deposit fallback, never both, never more.
const MAX_EXECUTE_ATTEMPTS: u32 = 2;

/// Deposit fallback tops the balance up to `total * (100 + buffer) / 100`.
const DEPOSIT_BUFFER_PCT: u64 = 20;

pub struct Orchestrator<T: RpcTransport, P: ProofGenerator> {
    settlement: SettlementClient<T>,
    prover: P,
    ledger: TradeHistoryLedger,
    trader: Address,
    attempts: Mutex<HashMap<u64, TradeAttempt>>,
    next_id: AtomicU64,
}

impl<T: RpcTransport, P: ProofGenerator> Orchestrator<T, P> {
    pub fn new(
        settlement: SettlementClient<T>,
        prover: P,
        ledger: TradeHistoryLedger,
        trader: Address,
    ) -> Self {
        Self {
            settlement,
            prover,
            ledger,
            trader,
            attempts: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn ledger(&self) -> &TradeHistoryLedger {
        &self.ledger
    }

    /// Validates the intent, derives the first commitment, and registers the
    /// attempt. Returns its id; nothing has touched the chain yet.
    pub async fn begin_attempt(&self, intent: TradeIntent) -> Result<u64, TradeError> {
        commitment::validate_intent(&intent)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut attempt = TradeAttempt::new(id, intent);
        let derived =
            commitment::derive(&attempt.intent, self.trader, commitment::mint_secret());
        println!(
            "[Orchestrator] Attempt {}: commitment 0x{}",
            id,
            hex::encode(derived.hash)
        );
        attempt.commitment = Some(derived);
        attempt.state = AttemptState::CommitmentReady;

        self.attempts.lock().await.insert(id, attempt);
        Ok(id)
    }

    /// Snapshot of an attempt, if it exists.
    pub async fn attempt(&self, id: u64) -> Option<TradeAttempt> {
        self.attempts.lock().await.get(&id).cloned()
    }

    /// Drops an attempt that has not touched the chain. Once a commitment or
    /// execute transaction is on-chain the attempt must run to a terminal
    /// state to keep the ledger consistent with chain state.
    pub async fn abandon(&self, id: u64) -> Result<()> {
        let mut attempts = self.attempts.lock().await;
        let attempt = attempts
            .get(&id)
            .ok_or_else(|| anyhow!("unknown attempt id {}", id))?;
        if attempt.in_flight {
            bail!("attempt {} cannot be abandoned while it is being driven", id);
        }
        match attempt.state {
            AttemptState::Idle | AttemptState::CommitmentReady => {
                attempts.remove(&id);
                println!("[Orchestrator] Attempt {} abandoned", id);
                Ok(())
            }
            state => bail!("attempt {} cannot be abandoned in state {:?}", id, state),
        }
    }

    /// Drives an attempt to a terminal state and appends exactly one history
    /// record. Protocol failures land in the returned attempt (`Failed` plus
    /// a human-readable reason); `Err` is reserved for infrastructure
    /// problems such as an unknown id or ledger I/O.
    pub async fn run(&self, id: u64) -> Result<TradeAttempt> {
        // Claim the attempt under the arena lock before driving: two
        // concurrent `run` calls for one id must not both reach the chain or
        // write two terminal records.
        let mut attempt = {
            let mut attempts = self.attempts.lock().await;
            let stored = attempts
                .get_mut(&id)
                .ok_or_else(|| anyhow!("unknown attempt id {}", id))?;
            if stored.state != AttemptState::CommitmentReady {
                bail!("attempt {} is not runnable from {:?}", id, stored.state);
            }
            if stored.in_flight {
                bail!("attempt {} is already being driven", id);
            }
            stored.in_flight = true;
            stored.clone()
        };

        match self.drive(&mut attempt).await {
            Ok(()) => {
                println!("[Orchestrator] Attempt {} executed", id);
            }
            Err(e) => {
                eprintln!("[Orchestrator] Attempt {} failed: {}", id, e);
                attempt.state = AttemptState::Failed;
                attempt.failure = Some(e.to_string());
            }
        }
        attempt.in_flight = false;
        self.checkpoint(&attempt).await;

        let mut record = self.build_record(&attempt);
        if let Some(tx_hash) = attempt.execute_tx {
            record.on_chain = self.settlement.fetch_on_chain_data(tx_hash).await;
            if let (Some(on_chain), Some(quote)) =
                (record.on_chain.as_mut(), attempt.quote.as_ref())
            {
                on_chain.settled_collateral = Some(quote.total.to_string());
            }
        }
        self.ledger.append(record)?;
        Ok(attempt)
    }

    async fn drive(&self, attempt: &mut TradeAttempt) -> Result<(), TradeError> {
        loop {
            let commitment = attempt
                .commitment
                .clone()
                .ok_or_else(|| TradeError::InvalidIntent("attempt has no commitment".into()))?;
            let intent = attempt.intent.clone();

            let receipt = self.settlement.submit_commitment(commitment.hash).await?;
            attempt.commit_tx = Some(receipt.tx_hash);
            attempt.state = AttemptState::CommitmentSubmitted;
            self.checkpoint(attempt).await;

            // Cheap checks precede expensive ones: the collateral pre-flight
            // runs before any proving work starts.
            let snapshot = match self
                .settlement
                .read_balance(self.trader, intent.denomination)
                .await
            {
                Ok(snap) => Some(snap),
                Err(e) => {
                    eprintln!(
                        "[Orchestrator] Balance read failed, proceeding as balance-unknown: {}",
                        e
                    );
                    None
                }
            };
            let quote = collateral::quote(
                commitment.working_size,
                intent.leverage,
                intent.denomination,
                snapshot.as_ref(),
            );
            attempt.quote = Some(quote.clone());
            self.checkpoint(attempt).await;
            if !quote.sufficient {
                return Err(TradeError::InsufficientCollateral {
                    needed: quote.total,
                    available: snapshot.map(|s| s.available).unwrap_or_default(),
                });
            }

            let artifact = self.prover.prove(&commitment, &intent).await?;
            attempt.proof = Some(artifact.clone());
            attempt.state = AttemptState::ProofReady;
            self.checkpoint(attempt).await;

            attempt.state = AttemptState::Executing;
            attempt.execute_attempts += 1;
            self.checkpoint(attempt).await;

            let execute_result = self
                .settlement
                .execute_trade(
                    &artifact,
                    commitment.working_size,
                    intent.direction.is_long(),
                    intent.denomination,
                )
                .await;

            match execute_result {
                Ok(receipt) => {
                    attempt.execute_tx = Some(receipt.tx_hash);
                    attempt.state = AttemptState::Executed;
                    return Ok(());
                }
                Err(TradeError::InvalidCommitment) => {
                    if attempt.execute_attempts >= MAX_EXECUTE_ATTEMPTS {
                        return Err(TradeError::CommitmentExhausted);
                    }
                    // The commitment was consumed or stale; mint a fresh
                    // secret and go back through submission. The old proof is
                    // bound to the old hash and cannot be reused.
                    println!(
                        "[Orchestrator] Attempt {}: commitment rejected, minting a fresh one",
                        attempt.id
                    );
                    attempt.commitment = Some(commitment::derive(
                        &intent,
                        self.trader,
                        commitment::mint_secret(),
                    ));
                    attempt.proof = None;
                    attempt.state = AttemptState::CommitmentReady;
                    self.checkpoint(attempt).await;
                    continue;
                }
                Err(TradeError::InsufficientBalance) => {
                    if attempt.execute_attempts >= MAX_EXECUTE_ATTEMPTS {
                        return Err(TradeError::InsufficientBalance);
                    }
                    return self.deposit_and_retry(attempt, &artifact, &quote).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The compensating path out of a failed execute: top the balance up with
    /// a buffer, then retry once with the same proof and commitment. Any
    /// further failure is terminal.
    async fn deposit_and_retry(
        &self,
        attempt: &mut TradeAttempt,
        artifact: &ProofArtifact,
        quote: &CollateralQuote,
    ) -> Result<(), TradeError> {
        attempt.state = AttemptState::DepositPending;
        self.checkpoint(attempt).await;

        let top_up = quote.total * U256::from(100 + DEPOSIT_BUFFER_PCT) / U256::from(100u64);
        println!(
            "[Orchestrator] Attempt {}: balance short, depositing {}",
            attempt.id, top_up
        );
        if let Err(e) = self.settlement.deposit(quote.denomination, top_up).await {
            eprintln!("[Orchestrator] Deposit failed: {}", e);
            return Err(TradeError::DepositFallbackExhausted);
        }

        attempt.state = AttemptState::Executing;
        attempt.execute_attempts += 1;
        self.checkpoint(attempt).await;

        let intent = &attempt.intent;
        let working_size = attempt
            .commitment
            .as_ref()
            .map(|c| c.working_size)
            .unwrap_or_default();
        match self
            .settlement
            .execute_trade(
                artifact,
                working_size,
                intent.direction.is_long(),
                intent.denomination,
            )
            .await
        {
            Ok(receipt) => {
                attempt.execute_tx = Some(receipt.tx_hash);
                attempt.state = AttemptState::Executed;
                Ok(())
            }
            Err(e) => {
                eprintln!("[Orchestrator] Execute after deposit failed: {}", e);
                Err(TradeError::DepositFallbackExhausted)
            }
        }
    }

    async fn checkpoint(&self, attempt: &TradeAttempt) {
        self.attempts
            .lock()
            .await
            .insert(attempt.id, attempt.clone());
    }

    fn build_record(&self, attempt: &TradeAttempt) -> TradeHistoryRecord {
        let (status, failure_reason) = if attempt.state == AttemptState::Executed {
            (TradeStatus::Completed, None)
        } else {
            (TradeStatus::Failed, attempt.failure.clone())
        };
        TradeHistoryRecord {
            id: attempt.id,
            timestamp: Utc::now().timestamp(),
            asset: pair_symbol(attempt.intent.pair_id)
                .unwrap_or("UNKNOWN")
                .to_string(),
            size: attempt.intent.size.to_string(),
            direction: attempt.intent.direction,
            leverage: attempt.intent.leverage,
            collateral: attempt
                .quote
                .as_ref()
                .map(|q| q.collateral.to_string())
                .unwrap_or_default(),
            commitment_hash: attempt
                .commitment
                .as_ref()
                .map(|c| format!("0x{}", hex::encode(c.hash)))
                .unwrap_or_default(),
            commit_tx: attempt.commit_tx.map(|h| format!("{:#x}", h)),
            execute_tx: attempt.execute_tx.map(|h| format!("{:#x}", h)),
            on_chain: None,
            status,
            failure_reason,
        }
    }
}
