// --- Trade Intent & Protocol Models ---

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Fixed protocol scaling factor: 1 asset unit = 1e8 working-size base units.
pub const SIZE_SCALE: u64 = 100_000_000;

/// Smallest working size the settlement contract accepts (its minimum-notional floor).
pub const MIN_WORKING_SIZE: u64 = 1_000_000;

/// Largest working size the contract accepts.
pub const MAX_WORKING_SIZE: u64 = 1_000_000_000_000_000;

/// Trade fee in basis points, applied on top of the collateral requirement.
pub const FEE_RATE_BPS: u64 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum Denomination {
    Native,
    Stable,
}

impl Denomination {
    /// Per-denomination conversion from working-size base units (1e8 per asset
    /// unit) into the token's own base units. Native settles in an
    /// 18-decimals token, Stable in a 6-decimals token; adding a denomination
    /// means adding one arm here, call sites stay untouched.
    pub fn unit_scale(&self) -> U256 {
        match self {
            Denomination::Native => U256::from(4u64),
            Denomination::Stable => U256::from(100u64),
        }
    }

    /// The boolean flag the settlement contract uses to select the
    /// collateral token in `executeTrade` / `deposit` / `balanceOf`.
    pub fn flag(&self) -> bool {
        matches!(self, Denomination::Stable)
    }
}

pub struct Pair {
    pub id: u8,
    pub symbol: &'static str,
}

/// Fixed pair table; `TradeIntent::pair_id` indexes into this.
pub const PAIRS: &[Pair] = &[
    Pair { id: 0, symbol: "BTC-PERP" },
    Pair { id: 1, symbol: "ETH-PERP" },
    Pair { id: 2, symbol: "SOL-PERP" },
    Pair { id: 3, symbol: "ARB-PERP" },
];

pub fn pair_symbol(pair_id: u8) -> Option<&'static str> {
    PAIRS.iter().find(|p| p.id == pair_id).map(|p| p.symbol)
}

/// User-supplied trade parameters. Immutable once a commitment has been
/// derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub size: f64,
    pub direction: Direction,
    pub pair_id: u8,
    pub leverage: u32,
    pub denomination: Denomination,
}

/// One-way binding of the private trade parameters plus a secret nonce.
/// Single-use: once `executeTrade` has consumed the hash, a new trade needs a
/// fresh secret and hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub hash: H256,
    pub secret: u64,
    pub working_size: U256,
    pub trader: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralQuote {
    pub collateral: U256,
    pub fee: U256,
    pub total: U256,
    pub denomination: Denomination,
    pub sufficient: bool,
}

/// Proof plus the ordered public inputs a verifier checks. The input order is
/// a versioned interface shared with the on-chain verifier; see
/// `prover::public_inputs`.
#[derive(Debug, Clone)]
pub struct ProofArtifact {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<H256>,
    pub commitment_hash: H256,
}

/// Per-denomination balance held by the settlement contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub available: U256,
    pub locked: U256,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum AttemptState {
    Idle,
    CommitmentReady,
    CommitmentSubmitted,
    ProofReady,
    Executing,
    DepositPending,
    Executed,
    Failed,
}

/// The mutable unit the orchestrator advances. Each attempt owns its own
/// commitment and secret; concurrent attempts never share them.
#[derive(Debug, Clone)]
pub struct TradeAttempt {
    pub id: u64,
    pub intent: TradeIntent,
    pub commitment: Option<Commitment>,
    pub proof: Option<ProofArtifact>,
    pub quote: Option<CollateralQuote>,
    pub state: AttemptState,
    pub commit_tx: Option<H256>,
    pub execute_tx: Option<H256>,
    pub execute_attempts: u32,
    pub failure: Option<String>,
    /// Claimed by a `run` call; a second concurrent `run` of the same id is
    /// rejected so each attempt is driven at most once.
    pub in_flight: bool,
}

impl TradeAttempt {
    pub fn new(id: u64, intent: TradeIntent) -> Self {
        Self {
            id,
            intent,
            commitment: None,
            proof: None,
            quote: None,
            state: AttemptState::Idle,
            commit_tx: None,
            execute_tx: None,
            execute_attempts: 0,
            failure: None,
            in_flight: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AttemptState::Executed | AttemptState::Failed)
    }
}

// --- Trade History Models ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub enum TradeStatus {
    Completed,
    Failed,
}

/// Best-effort receipt data attached to a history record after execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnChainData {
    pub block_number: u64,
    pub confirmed_trader: Option<String>,
    pub settled_collateral: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHistoryRecord {
    pub id: u64,
    pub timestamp: i64,
    pub asset: String,
    pub size: String,
    pub direction: Direction,
    pub leverage: u32,
    pub collateral: String,
    pub commitment_hash: String,
    pub commit_tx: Option<String>,
    pub execute_tx: Option<String>,
    pub on_chain: Option<OnChainData>,
    pub status: TradeStatus,
    pub failure_reason: Option<String>,
}
