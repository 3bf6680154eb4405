use ethers::abi::{self, Token};
use ethers::types::{Address, U256};
use ethers::utils::keccak256;
use rand::Rng;

use crate::error::TradeError;
use crate::models::{
    pair_symbol, Commitment, TradeIntent, MAX_WORKING_SIZE, MIN_WORKING_SIZE, SIZE_SCALE,
};

/// Upper bound (exclusive) for commitment secrets: a uniform draw below 10^12
/// gives just under 40 bits of entropy, enough to defeat pre-image guessing
/// within the contract's commitment-reuse window.
const SECRET_BOUND: u64 = 1_000_000_000_000;

/// Draws a fresh commitment secret. Every commitment gets its own secret;
/// reuse after a failed execution is rejected by the contract.
pub fn mint_secret() -> u64 {
    rand::thread_rng().gen_range(0..SECRET_BOUND)
}

/// Scales a user-facing size (asset units) into working-size base units and
/// clamps it into the contract's accepted range.
pub fn working_size(size: f64) -> U256 {
    let scaled = (size * SIZE_SCALE as f64).floor();
    if scaled <= MIN_WORKING_SIZE as f64 {
        return U256::from(MIN_WORKING_SIZE);
    }
    if scaled >= MAX_WORKING_SIZE as f64 {
        return U256::from(MAX_WORKING_SIZE);
    }
    U256::from(scaled as u128)
}

/// Rejects intents the protocol cannot express. Runs before any commitment is
/// derived, so the encoder itself stays a pure function.
pub fn validate_intent(intent: &TradeIntent) -> Result<(), TradeError> {
    if !intent.size.is_finite() || intent.size <= 0.0 {
        return Err(TradeError::InvalidIntent(format!(
            "size must be positive, got {}",
            intent.size
        )));
    }
    if intent.leverage < 1 || intent.leverage > 100 {
        return Err(TradeError::InvalidIntent(format!(
            "leverage must be within 1..=100, got {}",
            intent.leverage
        )));
    }
    if pair_symbol(intent.pair_id).is_none() {
        return Err(TradeError::InvalidIntent(format!(
            "unknown pair id {}",
            intent.pair_id
        )));
    }
    Ok(())
}

/// Derives the binding commitment for an intent. Pure and deterministic for
/// identical inputs. The field order inside the hash pre-image is the wire
/// contract with the settlement contract and must never change on one side
/// only.
pub fn derive(intent: &TradeIntent, trader: Address, secret: u64) -> Commitment {
    let working_size = working_size(intent.size);
    let pre_image = abi::encode(&[
        Token::Uint(working_size),
        Token::Bool(intent.direction.is_long()),
        Token::Uint(U256::from(intent.pair_id)),
        Token::Uint(U256::from(intent.leverage)),
        Token::Uint(U256::from(secret)),
    ]);
    Commitment {
        hash: keccak256(pre_image).into(),
        secret,
        working_size,
        trader,
    }
}
