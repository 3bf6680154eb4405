//! Client-side core of a confidential perpetual-trading venue: commitment
//! derivation, collateral quoting, proof-bound trade execution with bounded
//! retry, and a capped durable trade history. Consumed as a library by a UI
//! layer; the RPC transport and the prover are injected at the boundary.

pub mod abi;
pub mod collateral;
pub mod commitment;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod prover;
pub mod rpc;
pub mod settlement;

pub use config::Config;
pub use error::{RpcError, TradeError};
pub use ledger::{TradeHistoryLedger, HISTORY_CAPACITY};
pub use models::{
    AttemptState, BalanceSnapshot, CollateralQuote, Commitment, Denomination, Direction,
    ProofArtifact, TradeAttempt, TradeHistoryRecord, TradeIntent, TradeStatus,
};
pub use orchestrator::Orchestrator;
pub use prover::{PlaceholderProver, ProofGenerator};
pub use rpc::{EthersTransport, RpcTransport, TxParams, TxReceipt};
pub use settlement::SettlementClient;
