use ethers::types::U256;
use thiserror::Error;

/// Transport-level failures, produced by `RpcTransport` implementations and
/// mapped into the protocol taxonomy by the settlement client.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The user or the node refused the request (wallet rejection, nonce
    /// policy, underpriced tx).
    #[error("rpc rejected: {0}")]
    Rejected(String),

    /// The endpoint could not be reached or timed out.
    #[error("rpc unavailable: {0}")]
    Unavailable(String),

    /// The call reverted; carries the raw revert payload for decoding.
    #[error("execution reverted (0x{})", hex::encode(.0))]
    Reverted(Vec<u8>),
}

#[derive(Debug, Clone, Error)]
pub enum TradeError {
    /// Caller error, never retried.
    #[error("invalid trade intent: {0}")]
    InvalidIntent(String),

    /// The user declined to sign; terminal.
    #[error("user cancelled the transaction")]
    UserCancelled,

    /// Gas estimation or node-side admission failed before broadcast.
    #[error("network rejected the transaction: {0}")]
    NetworkRejected(String),

    /// Endpoint unreachable or timed out; the caller may re-run the whole
    /// attempt, the orchestrator never retries this internally.
    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    /// Pre-flight collateral check failed; terminal until the user adjusts
    /// size, leverage, or denomination.
    #[error("insufficient collateral: need {needed}, have {available}")]
    InsufficientCollateral { needed: U256, available: U256 },

    /// The commitment is unknown, already consumed, or owned by a different
    /// trader. Retried once via a fresh commitment.
    #[error("commitment unknown, already consumed, or not owned by trader")]
    InvalidCommitment,

    /// The settlement balance cannot cover the trade. Retried once via the
    /// deposit fallback.
    #[error("insufficient settlement balance")]
    InsufficientBalance,

    #[error("commitment regeneration exhausted after repeated rejection")]
    CommitmentExhausted,

    #[error("deposit fallback exhausted")]
    DepositFallbackExhausted,

    /// Opaque contract-side revert, surfaced verbatim and never retried.
    #[error("contract reverted: {0}")]
    ContractRevert(String),

    #[error("proof generation failed: {0}")]
    ProofFailed(String),
}
