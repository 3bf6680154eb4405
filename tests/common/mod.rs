#![allow(dead_code)]

use async_trait::async_trait;
use darkpool_client::abi;
use darkpool_client::error::{RpcError, TradeError};
use darkpool_client::ledger::TradeHistoryLedger;
use darkpool_client::models::{
    Commitment, Denomination, Direction, ProofArtifact, TradeIntent,
};
use darkpool_client::orchestrator::Orchestrator;
use darkpool_client::prover::{PlaceholderProver, ProofGenerator};
use darkpool_client::rpc::{RpcTransport, TxParams, TxReceipt};
use darkpool_client::settlement::SettlementClient;
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn trader() -> Address {
    Address::repeat_byte(0x42)
}

pub fn contract() -> Address {
    Address::repeat_byte(0xCC)
}

/// The reference scenario: 0.01 asset units, long, pair 1, leverage 10,
/// stable denomination. Quote: collateral 1000, fee 2, total 1002.
pub fn intent() -> TradeIntent {
    TradeIntent {
        size: 0.01,
        direction: Direction::Long,
        pair_id: 1,
        leverage: 10,
        denomination: Denomination::Stable,
    }
}

/// Scripted in-memory transport. Outcomes for submit/execute are queued per
/// call; an empty queue means success. Executed commitment hashes are marked
/// consumed so re-execution is rejected like the real contract does.
pub struct MockTransport {
    pub available: Mutex<U256>,
    pub locked: Mutex<U256>,
    pub fail_balance_read: AtomicBool,
    pub submit_estimate_outcomes: Mutex<VecDeque<Result<(), RpcError>>>,
    pub submit_send_outcomes: Mutex<VecDeque<Result<(), RpcError>>>,
    pub execute_outcomes: Mutex<VecDeque<Result<(), RpcError>>>,
    pub consumed: Mutex<HashSet<Vec<u8>>>,
    pub sent: Mutex<Vec<TxParams>>,
    pub execute_estimates: AtomicUsize,
    /// When false, every receipt reports an on-chain revert.
    pub receipt_status_ok: AtomicBool,
    /// When true, receipts come back without a block number, as a node
    /// reports a transaction it has seen but not yet mined.
    pub pending_receipts: AtomicBool,
}

impl MockTransport {
    pub fn with_balance(available: u64) -> Arc<Self> {
        Arc::new(Self {
            available: Mutex::new(U256::from(available)),
            locked: Mutex::new(U256::zero()),
            fail_balance_read: AtomicBool::new(false),
            submit_estimate_outcomes: Mutex::new(VecDeque::new()),
            submit_send_outcomes: Mutex::new(VecDeque::new()),
            execute_outcomes: Mutex::new(VecDeque::new()),
            consumed: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            execute_estimates: AtomicUsize::new(0),
            receipt_status_ok: AtomicBool::new(true),
            pending_receipts: AtomicBool::new(false),
        })
    }

    pub fn script_executes(&self, outcomes: Vec<Result<(), RpcError>>) {
        *self.execute_outcomes.lock().unwrap() = outcomes.into();
    }

    pub fn invalid_commitment_revert() -> RpcError {
        RpcError::Reverted(abi::selector(abi::INVALID_COMMITMENT_ERROR_SIG).to_vec())
    }

    pub fn insufficient_balance_revert() -> RpcError {
        RpcError::Reverted(abi::selector(abi::INSUFFICIENT_BALANCE_ERROR_SIG).to_vec())
    }

    pub fn reason_revert(reason: &str) -> RpcError {
        let mut payload = vec![0x08, 0xc3, 0x79, 0xa0];
        payload.extend_from_slice(&ethers::abi::encode(&[ethers::abi::Token::String(
            reason.to_string(),
        )]));
        RpcError::Reverted(payload)
    }

    /// Calls sent for a given function, by selector.
    pub fn sent_calls(&self, signature: &str) -> Vec<TxParams> {
        let sel = abi::selector(signature);
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.data.len() >= 4 && p.data[..4] == sel)
            .cloned()
            .collect()
    }

    /// The commitment hash word of a submitCommitment payload.
    pub fn submitted_hash(params: &TxParams) -> H256 {
        H256::from_slice(&params.data[4..36])
    }

    /// The amount word of a deposit payload.
    pub fn deposit_amount(params: &TxParams) -> U256 {
        U256::from_big_endian(&params.data[36..68])
    }

    fn execute_commitment_word(data: &[u8]) -> Vec<u8> {
        // executeTrade head layout: bytes offset, array offset, then the
        // commitment hash as the third word.
        data[4 + 64..4 + 96].to_vec()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, _to: Address, data: Bytes) -> Result<Vec<u8>, RpcError> {
        if data.len() >= 4 && data[..4] == abi::selector(abi::BALANCE_OF_SIG) {
            if self.fail_balance_read.load(Ordering::SeqCst) {
                return Err(RpcError::Unavailable("balance endpoint down".into()));
            }
            return Ok(ethers::abi::encode(&[
                ethers::abi::Token::Uint(*self.available.lock().unwrap()),
                ethers::abi::Token::Uint(*self.locked.lock().unwrap()),
            ]));
        }
        Err(RpcError::Rejected("unexpected call".into()))
    }

    async fn send_transaction(&self, params: TxParams) -> Result<H256, RpcError> {
        if params.data.len() >= 4 {
            let sel = &params.data[..4];
            if sel == abi::selector(abi::SUBMIT_COMMITMENT_SIG) {
                if let Some(outcome) = self.submit_send_outcomes.lock().unwrap().pop_front() {
                    outcome?;
                }
            }
            if sel == abi::selector(abi::EXECUTE_TRADE_SIG) {
                self.consumed
                    .lock()
                    .unwrap()
                    .insert(Self::execute_commitment_word(&params.data));
            }
        }
        let mut sent = self.sent.lock().unwrap();
        let mut pre_image = params.data.to_vec();
        pre_image.push(sent.len() as u8);
        let tx_hash = H256::from(keccak256(pre_image));
        sent.push(params);
        Ok(tx_hash)
    }

    async fn estimate_gas(&self, params: &TxParams) -> Result<U256, RpcError> {
        if params.data.len() >= 4 {
            let sel = &params.data[..4];
            if sel == abi::selector(abi::SUBMIT_COMMITMENT_SIG) {
                if let Some(outcome) = self.submit_estimate_outcomes.lock().unwrap().pop_front() {
                    outcome?;
                }
            }
            if sel == abi::selector(abi::EXECUTE_TRADE_SIG) {
                self.execute_estimates.fetch_add(1, Ordering::SeqCst);
                let word = Self::execute_commitment_word(&params.data);
                if self.consumed.lock().unwrap().contains(&word) {
                    return Err(Self::invalid_commitment_revert());
                }
                if let Some(outcome) = self.execute_outcomes.lock().unwrap().pop_front() {
                    outcome?;
                }
            }
        }
        Ok(U256::from(100_000u64))
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TxReceipt>, RpcError> {
        let block_number = if self.pending_receipts.load(Ordering::SeqCst) {
            None
        } else {
            Some(7)
        };
        Ok(Some(TxReceipt {
            tx_hash,
            block_number,
            from: Some(trader()),
            status: self.receipt_status_ok.load(Ordering::SeqCst),
        }))
    }
}

/// Prover that counts invocations, so tests can assert the collateral
/// pre-flight really runs before any proving work.
pub struct CountingProver {
    pub calls: Arc<AtomicUsize>,
    inner: PlaceholderProver,
}

impl CountingProver {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                inner: PlaceholderProver::new(Duration::from_millis(1)),
            },
            calls,
        )
    }
}

#[async_trait]
impl ProofGenerator for CountingProver {
    async fn prove(
        &self,
        commitment: &Commitment,
        intent: &TradeIntent,
    ) -> Result<ProofArtifact, TradeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.prove(commitment, intent).await
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator<MockTransport, CountingProver>,
    pub transport: Arc<MockTransport>,
    pub prover_calls: Arc<AtomicUsize>,
    _ledger_dir: tempfile::TempDir,
}

pub fn harness(transport: Arc<MockTransport>) -> Harness {
    let ledger_dir = tempfile::tempdir().expect("tempdir");
    let ledger = TradeHistoryLedger::open(ledger_dir.path().to_str().unwrap()).expect("ledger");
    let settlement = SettlementClient::new(
        Arc::clone(&transport),
        contract(),
        Duration::from_secs(5),
    );
    let (prover, prover_calls) = CountingProver::new();
    Harness {
        orchestrator: Orchestrator::new(settlement, prover, ledger, trader()),
        transport,
        prover_calls,
        _ledger_dir: ledger_dir,
    }
}
